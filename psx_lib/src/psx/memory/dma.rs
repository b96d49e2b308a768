//! The PlayStation DMA, used to copy data between the RAM and various devices. Only the GPU and
//! OTC ports are wired; transfers run synchronously within the store that activates them.

pub mod channel;
pub mod port;

use std::ops::{Index, IndexMut};

use crate::error::{PsxError, Result};
use crate::psx::addressable::{AccessWidth, Addressable};
use crate::psx::bus::Bus;
use crate::psx::gpu;
use crate::psx::memory::dma::channel::{Channel, Direction, Step, SyncMode};
use crate::psx::memory::dma::port::Port;
use crate::psx::memory::map;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Dma {
    control: Control,
    irq_config: IrqConfig,
    /// The 7 DMA channels
    channels: [Channel; 7],
}

impl Dma {
    pub fn new() -> Dma {
        Dma {
            control: Control::new(),
            irq_config: IrqConfig::new(),
            channels: [
                Channel::new(),
                Channel::new(),
                Channel::new(),
                Channel::new(),
                Channel::new(),
                Channel::new(),
                Channel::new(),
            ],
        }
    }
}

impl Index<Port> for Dma {
    type Output = Channel;

    fn index(&self, port: Port) -> &Self::Output {
        &self.channels[port as usize]
    }
}

impl IndexMut<Port> for Dma {
    fn index_mut(&mut self, port: Port) -> &mut Self::Output {
        &mut self.channels[port as usize]
    }
}

pub fn load<T: Addressable>(bus: &mut Bus, offset: u32) -> Result<T> {
    if T::width() != AccessWidth::Word {
        panic!("Unhandled DMA load ({:?})", T::width());
    }

    let major = (offset >> 4) & 7;
    let minor = offset & 0xf;

    let v = match major {
        // Per-channel registers
        0..=6 => {
            let port = Port::from_index(major);
            let channel = &bus.dma[port];

            match minor {
                0 => channel.base,
                4 => channel.block_control(),
                8 => channel.ctrl.get(),
                _ => return Err(bad_register(offset)),
            }
        }
        // Controller registers
        7 => match minor {
            0 => bus.dma.control.get(),
            4 => bus.dma.irq_config.get(),
            _ => return Err(bad_register(offset)),
        },
        _ => unreachable!(),
    };

    Ok(T::from_u32(v))
}

pub fn store<T: Addressable>(bus: &mut Bus, offset: u32, val: T) -> Result<()> {
    if T::width() != AccessWidth::Word {
        panic!("Unhandled DMA store ({:?})", T::width());
    }

    let val = val.as_u32();

    let major = (offset >> 4) & 7;
    let minor = offset & 0xf;

    match major {
        // Per-channel registers
        0..=6 => {
            let port = Port::from_index(major);

            match minor {
                0 => bus.dma[port].set_base_address(val),
                4 => bus.dma[port].set_block_control(val),
                8 => set_channel_control(bus, port, val)?,
                _ => return Err(bad_register(offset)),
            }
        }
        // Controller registers
        7 => match minor {
            0 => bus.dma.control.set(val),
            4 => bus.dma.irq_config.set(val),
            _ => return Err(bad_register(offset)),
        },
        _ => unreachable!(),
    }

    Ok(())
}

fn bad_register(offset: u32) -> PsxError {
    PsxError::OutOfRange {
        addr: map::DMA.0 + offset,
    }
}

/// Update a channel's control register. If the write leaves the channel active the transfer runs
/// immediately and the channel deactivates before we return to the caller.
fn set_channel_control(bus: &mut Bus, port: Port, val: u32) -> Result<()> {
    bus.dma[port].ctrl.set(val);

    if bus.dma[port].ctrl.active() {
        run_transfer(bus, port)?;

        // TODO set the channel's interrupt flag in `irq_config` on completion
        bus.dma[port].ctrl.done();
    }

    Ok(())
}

/// Execute a full DMA transfer for `port`
fn run_transfer(bus: &mut Bus, port: Port) -> Result<()> {
    match bus.dma[port].ctrl.sync_mode()? {
        SyncMode::Manual | SyncMode::Request => run_block(bus, port),
        SyncMode::LinkedList => run_linked_list(bus, port),
    }
}

/// Block copy in manual or request mode: move `transfer_size` words between the RAM and the
/// device, stepping the RAM address by 4 bytes per word.
fn run_block(bus: &mut Bus, port: Port) -> Result<()> {
    let channel = &bus.dma[port];

    let direction = channel.ctrl.direction();
    let step = channel.ctrl.step();

    // Can't be None since linked-list transfers don't come here
    let size = channel.transfer_size()?.unwrap();

    let mut addr = channel.base;
    let mut remaining = size;

    while remaining > 0 {
        // Addresses are masked to stay within the RAM, with the two LSBs cut off since we're
        // moving words
        let cur_addr = addr & 0x1f_fffc;

        match direction {
            Direction::FromRam => {
                let word = bus.ram.load::<u32>(cur_addr);

                port_store(bus, port, word)?;
            }
            Direction::ToRam => {
                let word = port_load(bus, port, addr, remaining == size)?;

                bus.ram.store::<u32>(cur_addr, word);
            }
        }

        addr = match step {
            Step::Increment => addr.wrapping_add(4),
            Step::Decrement => addr.wrapping_sub(4),
        };

        remaining -= 1;
    }

    Ok(())
}

/// Linked-list transfer: walk a chain of `{next, size}` headers in RAM, pushing each packet's
/// payload to the GPU's GP0 port. Only makes sense for GPU command lists.
fn run_linked_list(bus: &mut Bus, port: Port) -> Result<()> {
    let channel = &bus.dma[port];

    if port != Port::Gpu {
        return Err(PsxError::Unimplemented(format!(
            "Linked list DMA on port {:?}",
            port
        )));
    }

    if channel.ctrl.direction() == Direction::ToRam {
        return Err(PsxError::Unimplemented(
            "Invalid DMA direction for linked list mode".to_string(),
        ));
    }

    let mut addr = channel.base & 0x1f_fffc;

    loop {
        let header = bus.ram.load::<u32>(addr);

        // The size byte counts the header slot itself, so `size - 1` command words follow. Its
        // MSB doubles as the end-of-table flag and is not part of the count.
        let size = (header >> 24) & 0x7f;

        for i in 1..size {
            let command = bus.ram.load::<u32>(addr.wrapping_add(4 * i) & 0x1f_fffc);

            gpu::gp0(bus, command)?;
        }

        if header & 0x0080_0000 != 0 || header & 0x8000_0000 != 0 {
            // End-of-table marker
            break;
        }

        addr = header & 0x1f_fffc;
    }

    Ok(())
}

/// Perform a DMA word write to a device
fn port_store(bus: &mut Bus, port: Port, word: u32) -> Result<()> {
    match port {
        Port::Gpu => gpu::dma_store(bus, word),
        _ => Err(PsxError::Unimplemented(format!(
            "DMA port store {:?}",
            port
        ))),
    }
}

/// Perform a DMA word read from a device. `addr` is the current (unmasked) RAM pointer and
/// `first` tells whether this is the first word of the transfer.
fn port_load(bus: &mut Bus, port: Port, addr: u32, first: bool) -> Result<u32> {
    let _ = bus;

    match port {
        Port::Otc => {
            let word = if first {
                // The entry at the channel base holds the end-of-table marker
                0xff_ffff
            } else {
                // Every other entry points at itself, one slot below the previous one
                addr & 0x1f_ffff
            };

            Ok(word)
        }
        _ => Err(PsxError::Unimplemented(format!("DMA port load {:?}", port))),
    }
}

/// DMA control register. Holds per-channel priorities which this implementation doesn't use, the
/// value is simply stored and read back.
#[derive(serde::Serialize, serde::Deserialize)]
struct Control(u32);

impl Control {
    fn new() -> Control {
        Control(DMA_CONTROL_RESET)
    }

    fn set(&mut self, conf: u32) {
        self.0 = conf;
    }

    fn get(&self) -> u32 {
        self.0
    }
}

/// Reset value of the DMA control register
const DMA_CONTROL_RESET: u32 = 0x0765_4321;

/// DMA interrupt config register.
///
/// Layout: dummy bits [5:0], force IRQ bit 15, per-channel IRQ enables [22:16], master IRQ
/// enable bit 23, per-channel flags [30:24] (write 1 to acknowledge), master flag bit 31
/// (read-only, derived from the rest). Bits [14:6] are reserved and read as zero.
#[derive(serde::Serialize, serde::Deserialize)]
struct IrqConfig(u32);

impl IrqConfig {
    fn new() -> IrqConfig {
        IrqConfig(0)
    }

    fn set(&mut self, conf: u32) {
        let write_mask = 0x00ff_803f;
        self.0 &= !write_mask;
        self.0 |= conf & write_mask;

        // Writing 1 to the flag bits acks the interrupts
        let ack = conf & 0x7f00_0000;
        self.0 &= !ack;

        self.refresh_irq();
    }

    fn get(&self) -> u32 {
        self.0
    }

    fn master_irq_forced(&self) -> bool {
        self.0 & (1 << 15) != 0
    }

    fn channel_irq_enable(&self) -> bool {
        self.0 & (1 << 23) != 0
    }

    /// Recompute the master IRQ flag in bit 31. It's a pure function of the other fields and is
    /// never written directly.
    fn refresh_irq(&mut self) {
        let flags = (self.0 >> 24) & 0x7f;
        let enables = (self.0 >> 16) & 0x7f;

        let channel_irq_active = self.channel_irq_enable() && (flags & enables) != 0;

        if channel_irq_active || self.master_irq_forced() {
            self.0 |= 1 << 31;
        } else {
            self.0 &= !(1 << 31);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_ack_roundtrip() {
        let mut irq = IrqConfig::new();

        // Raise a few flags by writing the raw register, then refresh
        irq.0 |= 0x0500_0000;
        irq.refresh_irq();

        // Flags set but not enabled: no signal
        assert_eq!(irq.get() & (1 << 31), 0);

        // Ack flag 0 only
        irq.set(0x0100_0000);
        assert_eq!((irq.get() >> 24) & 0x7f, 0x04);

        // Ack everything
        irq.set(0x7f00_0000);
        assert_eq!((irq.get() >> 24) & 0x7f, 0);
    }

    #[test]
    fn reserved_bits_read_zero() {
        let mut irq = IrqConfig::new();

        irq.set(0xffff_ffff);

        assert_eq!(irq.get() & 0x7fc0, 0);
    }

    #[test]
    fn signal_is_derived() {
        let mut irq = IrqConfig::new();

        // Force IRQ alone raises the signal
        irq.set(1 << 15);
        assert_ne!(irq.get() & (1 << 31), 0);

        irq.set(0);
        assert_eq!(irq.get() & (1 << 31), 0);

        // Master enable + enabled flag
        irq.0 |= 1 << 24;
        irq.set((1 << 23) | (1 << 16));
        assert_ne!(irq.get() & (1 << 31), 0);

        // Acking the flag drops the signal
        irq.set((1 << 23) | (1 << 16) | (1 << 24));
        assert_eq!(irq.get() & (1 << 31), 0);
    }
}
