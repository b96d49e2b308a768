//! PlayStation machine core: MIPS R3000A interpreter, memory bus, DMA controller and GPU
//! front-end. Rasterization and presentation are not part of this crate: the GPU front-end
//! decodes draw commands into messages and hands them to an external consumer over a
//! single-slot rendezvous (see [`link`]).

mod box_array;
mod error;
mod psx;

use std::sync::atomic::{AtomicBool, Ordering};

use log::info;
use serde::{Deserialize, Serialize};

use psx::bios::Bios;
use psx::bus::Bus;
use psx::gpu::Gpu;
use psx::memory::dma::Dma;
use psx::memory::ram::Ram;
use psx::memory::scratch_pad::ScratchPad;
use psx::processor::cop0::Cop0;
use psx::processor::cpu::{self, Cpu};

pub use error::{PsxError, Result};
pub use psx::bios::BIOS_SIZE;
pub use psx::gpu::commands::{Color, Position, Vertex};
pub use psx::gpu::link::{link, GpuMsg, Link, Output};

pub struct Psx {
    bus: Box<Bus>,
}

impl Psx {
    /// Build a machine from a BIOS blob. `link` is the producer half of the draw-message
    /// hand-off created with [`link`].
    pub fn new(bios_blob: &[u8], link: Link) -> Result<Psx> {
        let bios = Bios::new(bios_blob)?;

        Ok(Psx {
            bus: Box::new(Bus::new(bios, link)),
        })
    }

    /// Fetch, decode and execute a single instruction
    pub fn step(&mut self) -> Result<()> {
        cpu::run_next_instruction(&mut self.bus)
    }

    /// Run the interpreter until `shutdown` is raised or a fatal error occurs. The flag is only
    /// observed between instructions, so a thread blocked on the message hand-off needs its
    /// consumer to keep draining until this function returns.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        while !shutdown.load(Ordering::SeqCst) {
            cpu::run_next_instruction(&mut self.bus)?;
        }

        info!("Shutdown requested, stopping the emulator");

        Ok(())
    }

    /// CPU state, mainly useful to dump the registers when something goes wrong
    pub fn cpu(&self) -> &Cpu {
        &self.bus.cpu
    }

    /// Serialize the machine state (everything except the BIOS ROM) to a byte blob
    pub fn save_state(&self) -> Result<Vec<u8>> {
        let state = SaveStateRef {
            cpu: &self.bus.cpu,
            cop0: &self.bus.cop0,
            ram: &self.bus.ram,
            scratch_pad: &self.bus.scratch_pad,
            dma: &self.bus.dma,
            gpu: &self.bus.gpu,
        };

        let mut fb = flexbuffers::FlexbufferSerializer::new();

        state
            .serialize(&mut fb)
            .map_err(|e| PsxError::SerializationError(e.to_string()))?;

        Ok(fb.take_buffer())
    }

    /// Restore a state blob previously created with `save_state`. The machine keeps its BIOS
    /// and its message link.
    pub fn load_state(&mut self, state: &[u8]) -> Result<()> {
        let reader = flexbuffers::Reader::get_root(state)
            .map_err(|e| PsxError::DeserializationError(e.to_string()))?;

        let state = SaveState::deserialize(reader)
            .map_err(|e| PsxError::DeserializationError(e.to_string()))?;

        let link = self.bus.gpu.link.clone();

        self.bus.cpu = state.cpu;
        self.bus.cop0 = state.cop0;
        self.bus.ram = state.ram;
        self.bus.scratch_pad = state.scratch_pad;
        self.bus.dma = state.dma;
        self.bus.gpu = state.gpu;

        // The deserialized GPU carries a dangling placeholder link, reconnect the live one
        self.bus.gpu.link = link;

        Ok(())
    }
}

/// Borrowed view of the machine state used for serialization
#[derive(Serialize)]
struct SaveStateRef<'a> {
    cpu: &'a Cpu,
    cop0: &'a Cop0,
    ram: &'a Ram,
    scratch_pad: &'a ScratchPad,
    dma: &'a Dma,
    gpu: &'a Gpu,
}

/// Owned twin of `SaveStateRef`, used when restoring
#[derive(Deserialize)]
struct SaveState {
    cpu: Cpu,
    cop0: Cop0,
    ram: Ram,
    scratch_pad: ScratchPad,
    dma: Dma,
    gpu: Gpu,
}
