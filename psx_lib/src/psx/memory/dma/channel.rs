use bitfield::bitfield;

use crate::error::{PsxError, Result};

/// State of a single DMA channel
#[derive(serde::Serialize, serde::Deserialize, Clone)]
pub struct Channel {
    pub ctrl: ChannelControl,
    /// Base address in RAM (24 bits)
    pub base: u32,
    /// Block size in words (manual and request mode only)
    pub block_size: u16,
    /// Number of blocks being transferred (request mode only)
    pub block_count: u16,
}

impl Channel {
    pub fn new() -> Channel {
        Channel {
            ctrl: ChannelControl(0),
            base: 0,
            block_size: 0,
            block_count: 0,
        }
    }

    pub fn set_base_address(&mut self, address: u32) {
        self.base = address & 0xff_ffff;
    }

    pub fn block_control(&self) -> u32 {
        let bs = u32::from(self.block_size);
        let bc = u32::from(self.block_count);

        (bc << 16) | bs
    }

    pub fn set_block_control(&mut self, val: u32) {
        self.block_size = val as u16;
        self.block_count = (val >> 16) as u16;
    }

    /// Number of words this channel is programmed to move. Linked-list transfers find their size
    /// in the list headers instead, so they have none.
    pub fn transfer_size(&self) -> Result<Option<u32>> {
        let bs = u32::from(self.block_size);
        let bc = u32::from(self.block_count);

        Ok(match self.ctrl.sync_mode()? {
            // For manual mode only the block size is used
            SyncMode::Manual => Some(bs),
            // In request mode we transfer `block_count` blocks of `block_size` words each
            SyncMode::Request => Some(bc * bs),
            // The size is not known ahead of time: the transfer walks the list until it hits the
            // end-of-table marker
            SyncMode::LinkedList => None,
        })
    }
}

/// DMA transfer synchronization mode
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum SyncMode {
    /// Transfer starts when the CPU writes to the trigger bit and moves everything at once
    Manual = 0,
    /// Sync blocks to DMA requests
    Request = 1,
    /// Used to transfer GPU command lists
    LinkedList = 2,
}

/// Transfer direction, relative to the RAM
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Direction {
    ToRam = 0,
    FromRam = 1,
}

/// Per-word address step during a transfer
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum Step {
    Increment = 0,
    Decrement = 1,
}

// DMA channel control register. The unlabeled bits are reserved and read as zero, except for the
// two unknown read/write bits 29 and 30 which are kept as written.
bitfield! {
    #[derive(serde::Serialize, serde::Deserialize, Copy, Clone)]
    pub struct ChannelControl(u32);
    impl Debug;

    /// 0 for device-to-RAM, 1 for RAM-to-device
    pub bool, from_ram, set_from_ram: 0;

    /// Step the RAM address by +4 when 0, -4 when 1
    pub bool, backwards, set_backwards: 1;

    /// Enable "chopping" (cycle stealing by the CPU)
    pub bool, chop, set_chop: 8;

    /// 0 = manual, 1 = request, 2 = linked list, 3 = reserved
    pub u8, transfer_mode, set_transfer_mode: 10, 9;

    /// Chopping DMA window size (log2 words)
    pub u8, chop_dma_size, set_chop_dma_size: 18, 16;

    /// Chopping CPU window size (log2 cycles)
    pub u8, chop_cpu_size, set_chop_cpu_size: 22, 20;

    /// 1 while a transfer is programmed
    pub bool, enabled, set_enabled: 24;

    /// Force the transfer to start without waiting for a device request
    pub bool, trigger, set_trigger: 28;

    /// Unknown r/w bit
    pub bool, unknown_29, set_unknown_29: 29;

    /// Unknown r/w bit
    pub bool, unknown_30, set_unknown_30: 30;
}

/// Bits of the control register that are actually wired; everything else reads as zero
const CHANNEL_CONTROL_MASK: u32 = 0x7177_0703;

impl ChannelControl {
    /// Update the register from a CPU write, zeroing the reserved bits
    pub fn set(&mut self, val: u32) {
        self.0 = val & CHANNEL_CONTROL_MASK;
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// A channel is active when it's enabled and, for manual transfers, has been triggered
    pub fn active(self) -> bool {
        // In manual mode the CPU must also set the trigger bit to start the transfer
        let triggered = match self.transfer_mode() {
            0 => self.trigger(),
            _ => true,
        };

        self.enabled() && triggered
    }

    pub fn sync_mode(self) -> Result<SyncMode> {
        match self.transfer_mode() {
            0 => Ok(SyncMode::Manual),
            1 => Ok(SyncMode::Request),
            2 => Ok(SyncMode::LinkedList),
            n => Err(PsxError::Unimplemented(format!("DMA sync mode {}", n))),
        }
    }

    pub fn direction(self) -> Direction {
        if self.from_ram() {
            Direction::FromRam
        } else {
            Direction::ToRam
        }
    }

    pub fn step(self) -> Step {
        if self.backwards() {
            Step::Decrement
        } else {
            Step::Increment
        }
    }

    /// Called when the transfer completes: clear the enable and trigger bits
    pub fn done(&mut self) {
        self.set_enabled(false);
        self.set_trigger(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserved_bits_are_cleared() {
        let mut ctrl = ChannelControl(0);

        ctrl.set(0xffff_ffff);

        assert_eq!(ctrl.get(), CHANNEL_CONTROL_MASK);
        // The two unknown bits survive
        assert!(ctrl.unknown_29());
        assert!(ctrl.unknown_30());
    }

    #[test]
    fn activation_rules() {
        let mut ctrl = ChannelControl(0);

        // Manual mode: enable alone is not enough
        ctrl.set(1 << 24);
        assert!(!ctrl.active());

        // Enable + trigger
        ctrl.set((1 << 24) | (1 << 28));
        assert!(ctrl.active());

        // Linked list mode doesn't need the trigger
        ctrl.set((1 << 24) | (2 << 9));
        assert!(ctrl.active());

        // Trigger without enable does nothing
        ctrl.set(1 << 28);
        assert!(!ctrl.active());
    }

    #[test]
    fn done_clears_enable_and_trigger() {
        let mut ctrl = ChannelControl(0);

        ctrl.set((1 << 24) | (1 << 28) | 1);
        ctrl.done();

        assert!(!ctrl.enabled());
        assert!(!ctrl.trigger());
        assert!(!ctrl.active());
        // The rest of the register is untouched
        assert!(ctrl.from_ram());
    }

    #[test]
    fn transfer_sizes() {
        let mut channel = Channel::new();

        channel.set_block_control(0x0002_0010);

        channel.ctrl.set(0);
        assert_eq!(channel.transfer_size().unwrap(), Some(0x10));

        channel.ctrl.set(1 << 9);
        assert_eq!(channel.transfer_size().unwrap(), Some(0x20));

        channel.ctrl.set(2 << 9);
        assert_eq!(channel.transfer_size().unwrap(), None);
    }
}
