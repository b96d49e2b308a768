//! Memory bus: owns the memories and the mapped devices and routes width-typed loads and stores
//! to them.

use log::debug;

use crate::error::{PsxError, Result};
use crate::psx::addressable::Addressable;
use crate::psx::bios::Bios;
use crate::psx::gpu::link::Link;
use crate::psx::gpu::{self, Gpu};
use crate::psx::memory::dma::{self, Dma};
use crate::psx::memory::map;
use crate::psx::memory::ram::Ram;
use crate::psx::memory::scratch_pad::ScratchPad;
use crate::psx::processor::cop0::Cop0;
use crate::psx::processor::cpu::Cpu;

pub struct Bus {
    pub(crate) cpu: Cpu,
    pub(crate) cop0: Cop0,
    pub(crate) ram: Ram,
    pub(crate) scratch_pad: ScratchPad,
    pub(crate) bios: Bios,
    pub(crate) dma: Dma,
    pub(crate) gpu: Gpu,
}

impl Bus {
    pub fn new(bios: Bios, link: Link) -> Bus {
        Bus {
            cpu: Cpu::new(),
            cop0: Cop0::new(),
            ram: Ram::new(),
            scratch_pad: ScratchPad::new(),
            bios,
            dma: Dma::new(),
            gpu: Gpu::new(link),
        }
    }

    /// Route a load to the device mapped at `addr`
    pub fn load<T: Addressable>(&mut self, addr: u32) -> Result<T> {
        let abs_addr = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(abs_addr) {
            return Ok(self.ram.load(offset));
        }

        if let Some(offset) = map::BIOS.contains(abs_addr) {
            return Ok(self.bios.load(offset));
        }

        if let Some(offset) = map::SCRATCH_PAD.contains(abs_addr) {
            return Ok(self.scratch_pad.load(offset));
        }

        if let Some(offset) = map::DMA.contains(abs_addr) {
            return dma::load(self, offset);
        }

        if let Some(offset) = map::GPU.contains(abs_addr) {
            return Ok(gpu::load(self, offset));
        }

        if map::SPU.contains(abs_addr).is_some() {
            // The SPU is not part of this machine
            return Ok(T::from_u32(0));
        }

        if map::EXPANSION_1.contains(abs_addr).is_some() {
            // No expansion hardware plugged in
            return Ok(T::from_u32(0xff));
        }

        if let Some(offset) = map::IRQ_CONTROL.contains(abs_addr) {
            debug!("IRQ control read 0x{:x}", offset);
            return Ok(T::from_u32(0));
        }

        if let Some(offset) = map::TIMERS.contains(abs_addr) {
            debug!("Timer register read 0x{:x}", offset);
            return Ok(T::from_u32(0));
        }

        Err(PsxError::OutOfRange { addr })
    }

    /// Route a store to the device mapped at `addr`
    pub fn store<T: Addressable>(&mut self, addr: u32, val: T) -> Result<()> {
        let abs_addr = map::mask_region(addr);

        if let Some(offset) = map::RAM.contains(abs_addr) {
            self.ram.store(offset, val);
            return Ok(());
        }

        if let Some(offset) = map::SCRATCH_PAD.contains(abs_addr) {
            self.scratch_pad.store(offset, val);
            return Ok(());
        }

        if let Some(offset) = map::DMA.contains(abs_addr) {
            return dma::store(self, offset, val);
        }

        if let Some(offset) = map::GPU.contains(abs_addr) {
            return gpu::store(self, offset, val);
        }

        if map::SPU.contains(abs_addr).is_some() {
            // The SPU is not part of this machine, swallow the write
            return Ok(());
        }

        if let Some(offset) = map::MEM_CONTROL.contains(abs_addr) {
            // Memory latency configuration, only the BIOS touches it during boot
            debug!("Ignoring memory control write 0x{:x}", offset);
            return Ok(());
        }

        if map::RAM_SIZE.contains(abs_addr).is_some() {
            debug!("Ignoring RAM_SIZE write");
            return Ok(());
        }

        if map::CACHE_CONTROL.contains(abs_addr).is_some() {
            debug!("Ignoring cache control write");
            return Ok(());
        }

        if let Some(offset) = map::IRQ_CONTROL.contains(abs_addr) {
            debug!("Ignoring IRQ control write 0x{:x}", offset);
            return Ok(());
        }

        if let Some(offset) = map::TIMERS.contains(abs_addr) {
            debug!("Ignoring timer register write 0x{:x}", offset);
            return Ok(());
        }

        if map::EXPANSION_2.contains(abs_addr).is_some() {
            // Expansion 2 carries the BIOS "POST" debug register
            debug!("Ignoring expansion 2 write");
            return Ok(());
        }

        Err(PsxError::OutOfRange { addr })
    }
}
