//! R3000A CPU interpreter

use std::fmt;

use crate::error::Result;
use crate::psx::addressable::Addressable;
use crate::psx::bus::Bus;
use crate::psx::processor::cop0::{self, Exception};
use crate::psx::processor::instruction::Instruction;
use crate::psx::processor::opcodes::OPCODE_HANDLERS;
use crate::psx::processor::RegisterIndex;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Cpu {
    /// Address of the instruction currently being executed. Used for setting the EPC in
    /// exceptions.
    pub(crate) current_pc: u32,
    /// The Program Counter register: points to the next instruction
    pub(crate) pc: u32,
    /// Next value for the PC, used to emulate the branch delay slot
    pub(crate) next_pc: u32,
    /// General Purpose Registers. The first entry (R0) must always contain 0
    regs: [u32; 32],
    /// HI register for division remainder and multiplication MSBs
    pub(crate) hi: u32,
    /// LO register for division quotient and multiplication LSBs
    pub(crate) lo: u32,
    /// Load initiated by the current instruction, taking effect in the next instruction's delay
    /// slot: target register and value
    pub(crate) load: Option<(RegisterIndex, u32)>,
    /// Set by the current instruction if a branch occurred and the next instruction will be in
    /// the delay slot
    pub(crate) branch: bool,
    /// Set if the current instruction executes in the delay slot
    delay_slot: bool,
}

impl Cpu {
    pub fn new() -> Cpu {
        // Reset value for the PC: beginning of BIOS ROM
        let reset_pc = 0xbfc0_0000;

        Cpu {
            current_pc: reset_pc,
            pc: reset_pc,
            next_pc: reset_pc.wrapping_add(4),
            // The reset value of the general purpose registers doesn't matter since the BIOS
            // doesn't read them before writing. R0 must be 0 however.
            regs: [0; 32],
            hi: 0,
            lo: 0,
            load: None,
            branch: false,
            delay_slot: false,
        }
    }

    /// Returns the address of the instruction currently being executed
    pub fn current_pc(&self) -> u32 {
        self.current_pc
    }

    /// Returns true if the instruction currently being executed is in a delay slot
    pub fn in_delay_slot(&self) -> bool {
        self.delay_slot
    }

    /// Return the current value of register `index`
    pub(crate) fn reg(&self, index: RegisterIndex) -> u32 {
        self.regs[index.0 as usize]
    }

    /// Put `val` into register `index`. If `index` is 0 nothing happens as R0 always contains 0.
    pub(crate) fn set_reg(&mut self, index: RegisterIndex, val: u32) {
        self.regs[index.0 as usize] = val;

        // R0 always contains 0
        self.regs[0] = 0;
    }

    /// Branch to immediate value `offset`
    pub(crate) fn branch(&mut self, offset: u32) {
        // Offset immediates are always shifted two places to the right since `PC` addresses have
        // to be aligned on 32 bits at all times
        let offset = offset << 2;

        self.next_pc = self.pc.wrapping_add(offset);
        self.branch = true;
    }

    /// Execute and clear any pending load
    pub(crate) fn delayed_load(&mut self) {
        if let Some((reg, val)) = self.load {
            self.set_reg(reg, val);

            // We clear the load now that it's been executed
            self.load = None;
        }
    }

    /// Execute the pending load (if any) and set up the next one. If the new load targets the
    /// same register as the current one then the older one is cancelled, i.e. it never makes it
    /// to the register.
    ///
    /// This method should be used instead of `delayed_load` by instructions that setup a delayed
    /// load.
    pub(crate) fn delayed_load_chain(&mut self, reg: RegisterIndex, val: u32) {
        if let Some((pending_reg, pending_val)) = self.load {
            if pending_reg != reg {
                self.set_reg(pending_reg, pending_val);
            }
        }

        self.load = Some((reg, val));
    }
}

/// Conventional names given to the MIPS registers
const REGISTER_NAMES: [&str; 32] = [
    "r0", // Hardwired to be always 0
    "at", // Assembler Temporary (reserved for the assembler)
    "v0", "v1", // First and second return values
    "a0", "a1", "a2", "a3", // First four function arguments
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "t7", // Temporary registers
    "s0", "s1", "s2", "s3", "s4", "s5", "s6", "s7", // Saved registers
    "t8", "t9", // Temporary registers
    "k0", "k1", // Reserved for kernel use
    "gp", // Global pointer (not normally used on the PSX)
    "sp", // Stack Pointer
    "fp", // Frame Pointer
    "ra", // Return address
];

impl fmt::Debug for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f)?;
        writeln!(f, "PC: 0x{:08x}", self.pc)?;

        for i in 0..16 {
            writeln!(
                f,
                "{}: 0x{:08x}    {}: 0x{:08x}",
                REGISTER_NAMES[i],
                self.regs[i],
                REGISTER_NAMES[i + 16],
                self.regs[i + 16]
            )?;
        }

        Ok(())
    }
}

/// Fetch, decode and execute a single instruction. Errors from the memory bus abort the step and
/// must terminate the emulation, architectural exceptions are handled internally.
pub fn run_next_instruction(bus: &mut Bus) -> Result<()> {
    // Explanation of the various *pc variables:
    //
    // * `bus.cpu.current_pc`: Pointer to the instruction about to be executed.
    //
    // * `bus.cpu.pc`: Pointer to the next instruction to be executed.
    //
    // * `bus.cpu.next_pc`: Value `bus.cpu.pc` will take on the *next* cycle, so effectively a
    //                      pointer to the next next instruction being executed. Branches and
    //                      jumps only modify this value, so the value of the next instruction
    //                      (pointed at by `bus.cpu.pc`) remains in the pipeline and the branch
    //                      delay slot is emulated accurately.
    bus.cpu.current_pc = bus.cpu.pc;
    bus.cpu.pc = bus.cpu.next_pc;
    bus.cpu.next_pc = bus.cpu.pc.wrapping_add(4);

    // If the last instruction was a branch then we're in the delay slot
    bus.cpu.delay_slot = bus.cpu.branch;
    bus.cpu.branch = false;

    if bus.cpu.current_pc % 4 != 0 {
        // PC is not correctly aligned!
        exception(bus, Exception::LoadAddressError);
        return Ok(());
    }

    // Fetch instruction at PC. The isolated-cache gate doesn't apply to instruction fetches, so
    // this goes straight to the bus.
    let instruction = Instruction(bus.load::<u32>(bus.cpu.current_pc)?);

    let handler = OPCODE_HANDLERS[instruction.opcode()];

    handler(bus, instruction)
}

/// Trigger an exception
pub(crate) fn exception(bus: &mut Bus, cause: Exception) {
    // Update the coprocessor state
    let handler_addr = cop0::enter_exception(bus, cause);

    // Exceptions don't have a branch delay, we jump directly into the handler
    bus.cpu.pc = handler_addr;
    bus.cpu.next_pc = handler_addr.wrapping_add(4);
}

/// Execute a memory write on behalf of an instruction. While the cache is isolated the write is
/// meant for cache maintenance and must not reach the bus.
pub(crate) fn store<T: Addressable>(bus: &mut Bus, addr: u32, val: T) -> Result<()> {
    if bus.cop0.cache_isolated() {
        return Ok(());
    }

    bus.store(addr, val)
}

/// Execute a memory read on behalf of an instruction. While the cache is isolated the value
/// never comes from memory; we return zero without touching the bus.
pub(crate) fn load<T: Addressable>(bus: &mut Bus, addr: u32) -> Result<T> {
    if bus.cop0.cache_isolated() {
        return Ok(T::from_u32(0));
    }

    bus.load(addr)
}
