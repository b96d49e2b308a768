use log::warn;

use crate::error::{PsxError, Result};
use crate::psx::bus::Bus;
use crate::psx::processor::cop0::{self, Exception};
use crate::psx::processor::cpu::{exception, load, store};
use crate::psx::processor::instruction::Instruction;
use crate::psx::processor::RegisterIndex;

/// Handler table for the main opcodes (instruction bits [31:26])
#[rustfmt::skip]
pub const OPCODE_HANDLERS: [fn(&mut Bus, Instruction) -> Result<()>; 64] = [
    // 0x00
    op_function, op_bxx,      op_j,        op_jal,
    op_beq,      op_bne,      op_blez,     op_bgtz,
    op_addi,     op_addiu,    op_slti,     op_sltiu,
    op_andi,     op_ori,      op_xori,     op_lui,
    // 0x10
    op_cop0,     op_cop1,     op_cop2,     op_cop3,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x20
    op_lb,       op_lh,       op_lwl,      op_lw,
    op_lbu,      op_lhu,      op_lwr,      op_illegal,
    op_sb,       op_sh,       op_swl,      op_sw,
    op_illegal,  op_illegal,  op_swr,      op_illegal,
    // 0x30
    op_lwc0,     op_lwc1,     op_lwc2,     op_lwc3,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_swc0,     op_swc1,     op_swc2,     op_swc3,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
];

/// Handler table for the function codes (instruction bits [5:0] when the opcode is 0)
#[rustfmt::skip]
const FUNCTION_HANDLERS: [fn(&mut Bus, Instruction) -> Result<()>; 64] = [
    // 0x00
    op_sll,      op_illegal,  op_srl,      op_sra,
    op_sllv,     op_illegal,  op_srlv,     op_srav,
    op_jr,       op_jalr,     op_illegal,  op_illegal,
    op_syscall,  op_break,    op_illegal,  op_illegal,
    // 0x10
    op_mfhi,     op_mthi,     op_mflo,     op_mtlo,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_mult,     op_multu,    op_div,      op_divu,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x20
    op_add,      op_addu,     op_sub,      op_subu,
    op_and,      op_or,       op_xor,      op_nor,
    op_illegal,  op_illegal,  op_slt,      op_sltu,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    // 0x30
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
    op_illegal,  op_illegal,  op_illegal,  op_illegal,
];

/// When the main opcode is 0 we need to dispatch through a secondary table based on bits [5:0]
/// of the instruction
fn op_function(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let handler = FUNCTION_HANDLERS[instruction.function()];

    handler(bus, instruction)
}

/// Shift Left Logical
///
/// `SLL $r0, $r0, 0` (machine code 0x0000_0000) is the idiomatic way of encoding a NOP
fn op_sll(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.shift();
    let t = instruction.t();
    let d = instruction.d();

    let v = bus.cpu.reg(t) << i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Shift Right Logical
fn op_srl(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.shift();
    let t = instruction.t();
    let d = instruction.d();

    let v = bus.cpu.reg(t) >> i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Shift Right Arithmetic
fn op_sra(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.shift();
    let t = instruction.t();
    let d = instruction.d();

    let v = (bus.cpu.reg(t) as i32) >> i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v as u32);

    Ok(())
}

/// Shift Left Logical Variable
fn op_sllv(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    // Shift amount is truncated to 5 bits
    let v = bus.cpu.reg(t) << (bus.cpu.reg(s) & 0x1f);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Shift Right Logical Variable
fn op_srlv(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    // Shift amount is truncated to 5 bits
    let v = bus.cpu.reg(t) >> (bus.cpu.reg(s) & 0x1f);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Shift Right Arithmetic Variable
fn op_srav(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    // Shift amount is truncated to 5 bits
    let v = (bus.cpu.reg(t) as i32) >> (bus.cpu.reg(s) & 0x1f);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v as u32);

    Ok(())
}

/// Jump Register
fn op_jr(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();

    bus.cpu.next_pc = bus.cpu.reg(s);
    bus.cpu.branch = true;

    bus.cpu.delayed_load();

    Ok(())
}

/// Jump And Link Register
fn op_jalr(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let d = instruction.d();

    let ra = bus.cpu.next_pc;

    bus.cpu.next_pc = bus.cpu.reg(s);
    bus.cpu.branch = true;

    bus.cpu.delayed_load();

    // Store return address in `d`
    bus.cpu.set_reg(d, ra);

    Ok(())
}

/// System Call
fn op_syscall(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    exception(bus, Exception::SysCall);

    Ok(())
}

/// Break
fn op_break(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    exception(bus, Exception::Break);

    Ok(())
}

/// Move From HI
fn op_mfhi(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();

    let hi = bus.cpu.hi;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, hi);

    Ok(())
}

/// Move To HI
fn op_mthi(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();

    bus.cpu.hi = bus.cpu.reg(s);

    bus.cpu.delayed_load();

    Ok(())
}

/// Move From LO
fn op_mflo(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();

    let lo = bus.cpu.lo;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, lo);

    Ok(())
}

/// Move To LO
fn op_mtlo(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();

    bus.cpu.lo = bus.cpu.reg(s);

    bus.cpu.delayed_load();

    Ok(())
}

/// Multiply (signed)
fn op_mult(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();

    let a = bus.cpu.reg(s) as i32;
    let b = bus.cpu.reg(t) as i32;

    let res = i64::from(a) * i64::from(b);
    let res = res as u64;

    bus.cpu.delayed_load();

    bus.cpu.hi = (res >> 32) as u32;
    bus.cpu.lo = res as u32;

    Ok(())
}

/// Multiply Unsigned
fn op_multu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();

    let a = bus.cpu.reg(s);
    let b = bus.cpu.reg(t);

    let res = u64::from(a) * u64::from(b);

    bus.cpu.delayed_load();

    bus.cpu.hi = (res >> 32) as u32;
    bus.cpu.lo = res as u32;

    Ok(())
}

/// Divide (signed)
fn op_div(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();

    let n = bus.cpu.reg(s) as i32;
    let d = bus.cpu.reg(t) as i32;

    bus.cpu.delayed_load();

    if d == 0 {
        // Division by zero, results are bogus
        bus.cpu.hi = n as u32;

        if n >= 0 {
            bus.cpu.lo = 0xffff_ffff;
        } else {
            bus.cpu.lo = 1;
        }
    } else if n as u32 == 0x8000_0000 && d == -1 {
        // Result is not representable in a 32bit signed integer
        bus.cpu.hi = 0;
        bus.cpu.lo = 0x8000_0000;
    } else {
        bus.cpu.hi = (n % d) as u32;
        bus.cpu.lo = (n / d) as u32;
    }

    Ok(())
}

/// Divide Unsigned
fn op_divu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();

    let n = bus.cpu.reg(s);
    let d = bus.cpu.reg(t);

    bus.cpu.delayed_load();

    if d == 0 {
        // Division by zero, results are bogus
        bus.cpu.hi = n;
        bus.cpu.lo = 0xffff_ffff;
    } else {
        bus.cpu.hi = n % d;
        bus.cpu.lo = n / d;
    }

    Ok(())
}

/// Add and check for signed overflow
fn op_add(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();
    let d = instruction.d();

    let s = bus.cpu.reg(s) as i32;
    let t = bus.cpu.reg(t) as i32;

    bus.cpu.delayed_load();

    match s.checked_add(t) {
        Some(v) => bus.cpu.set_reg(d, v as u32),
        None => exception(bus, Exception::Overflow),
    }

    Ok(())
}

/// Add Unsigned
fn op_addu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();
    let d = instruction.d();

    let v = bus.cpu.reg(s).wrapping_add(bus.cpu.reg(t));

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Subtract and check for signed overflow
fn op_sub(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();
    let d = instruction.d();

    let s = bus.cpu.reg(s) as i32;
    let t = bus.cpu.reg(t) as i32;

    bus.cpu.delayed_load();

    match s.checked_sub(t) {
        Some(v) => bus.cpu.set_reg(d, v as u32),
        None => exception(bus, Exception::Overflow),
    }

    Ok(())
}

/// Subtract Unsigned
fn op_subu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let s = instruction.s();
    let t = instruction.t();
    let d = instruction.d();

    let v = bus.cpu.reg(s).wrapping_sub(bus.cpu.reg(t));

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Bitwise And
fn op_and(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let v = bus.cpu.reg(s) & bus.cpu.reg(t);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Bitwise Or
fn op_or(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let v = bus.cpu.reg(s) | bus.cpu.reg(t);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Bitwise Exclusive Or
fn op_xor(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let v = bus.cpu.reg(s) ^ bus.cpu.reg(t);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Bitwise Not Or
fn op_nor(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let v = !(bus.cpu.reg(s) | bus.cpu.reg(t));

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v);

    Ok(())
}

/// Set on Less Than (signed)
fn op_slt(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let s = bus.cpu.reg(s) as i32;
    let t = bus.cpu.reg(t) as i32;

    let v = s < t;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v as u32);

    Ok(())
}

/// Set on Less Than Unsigned
fn op_sltu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let d = instruction.d();
    let s = instruction.s();
    let t = instruction.t();

    let v = bus.cpu.reg(s) < bus.cpu.reg(t);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(d, v as u32);

    Ok(())
}

/// Various branch instructions: BGEZ, BLTZ, BGEZAL, BLTZAL. Bits [20:16] are used to figure out
/// which one to use
fn op_bxx(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();

    let instruction = instruction.0;

    let is_bgez = (instruction >> 16) & 1;
    // It's not enough to test for bit 20 to see if we're supposed to link: if any bit in the
    // range [19:17] is set the link doesn't take place and RA is left untouched
    let is_link = (instruction >> 17) & 0xf == 0x8;

    let v = bus.cpu.reg(s) as i32;

    // Test "less than zero"
    let test = (v < 0) as u32;

    // If the test is "greater than or equal to zero" we need to negate the comparison above
    // ("a >= 0" <=> "!(a < 0)"). The xor takes care of that.
    let test = test ^ is_bgez;

    bus.cpu.delayed_load();

    // If linking is requested it occurs unconditionally, even if the branch is not taken
    if is_link {
        let ra = bus.cpu.next_pc;

        // Store return address in R31
        bus.cpu.set_reg(RegisterIndex(31), ra);
    }

    if test != 0 {
        bus.cpu.branch(i);
    }

    Ok(())
}

/// Jump
fn op_j(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let target = instruction.imm_jump();

    // The 26 bit immediate target only covers the low bits of the address, the 4 MSBs are simply
    // copied from the PC. That means the effective range of this instruction is limited: it
    // can't be used to switch from one memory area to another (like from KUSEG to KSEG0).
    bus.cpu.next_pc = (bus.cpu.pc & 0xf000_0000) | target;
    bus.cpu.branch = true;

    bus.cpu.delayed_load();

    Ok(())
}

/// Jump And Link
fn op_jal(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let ra = bus.cpu.next_pc;
    let target = instruction.imm_jump();

    bus.cpu.next_pc = (bus.cpu.pc & 0xf000_0000) | target;
    bus.cpu.branch = true;

    bus.cpu.delayed_load();

    // Store return address in R31
    bus.cpu.set_reg(RegisterIndex(31), ra);

    Ok(())
}

/// Branch if Equal
fn op_beq(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();
    let t = instruction.t();

    if bus.cpu.reg(s) == bus.cpu.reg(t) {
        bus.cpu.branch(i);
    }

    bus.cpu.delayed_load();

    Ok(())
}

/// Branch if Not Equal
fn op_bne(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();
    let t = instruction.t();

    if bus.cpu.reg(s) != bus.cpu.reg(t) {
        bus.cpu.branch(i);
    }

    bus.cpu.delayed_load();

    Ok(())
}

/// Branch if Less than or Equal to Zero
fn op_blez(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();

    let v = bus.cpu.reg(s) as i32;

    if v <= 0 {
        bus.cpu.branch(i);
    }

    bus.cpu.delayed_load();

    Ok(())
}

/// Branch if Greater Than Zero
fn op_bgtz(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();

    let v = bus.cpu.reg(s) as i32;

    if v > 0 {
        bus.cpu.branch(i);
    }

    bus.cpu.delayed_load();

    Ok(())
}

/// Add Immediate and check for signed overflow
fn op_addi(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se() as i32;
    let t = instruction.t();
    let s = instruction.s();

    let s = bus.cpu.reg(s) as i32;

    bus.cpu.delayed_load();

    match s.checked_add(i) {
        Some(v) => bus.cpu.set_reg(t, v as u32),
        None => exception(bus, Exception::Overflow),
    }

    Ok(())
}

/// Add Immediate Unsigned
fn op_addiu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let v = bus.cpu.reg(s).wrapping_add(i);

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v);

    Ok(())
}

/// Set if Less Than Immediate (signed)
fn op_slti(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se() as i32;
    let s = instruction.s();
    let t = instruction.t();

    let v = (bus.cpu.reg(s) as i32) < i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v as u32);

    Ok(())
}

/// Set if Less Than Immediate Unsigned
fn op_sltiu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let s = instruction.s();
    let t = instruction.t();

    let v = bus.cpu.reg(s) < i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v as u32);

    Ok(())
}

/// Bitwise And Immediate
fn op_andi(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm();
    let t = instruction.t();
    let s = instruction.s();

    let v = bus.cpu.reg(s) & i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v);

    Ok(())
}

/// Bitwise Or Immediate
fn op_ori(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm();
    let t = instruction.t();
    let s = instruction.s();

    let v = bus.cpu.reg(s) | i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v);

    Ok(())
}

/// Bitwise eXclusive Or Immediate
fn op_xori(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm();
    let t = instruction.t();
    let s = instruction.s();

    let v = bus.cpu.reg(s) ^ i;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v);

    Ok(())
}

/// Load Upper Immediate
fn op_lui(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm();
    let t = instruction.t();

    // Low 16 bits are set to 0
    let v = i << 16;

    bus.cpu.delayed_load();

    bus.cpu.set_reg(t, v);

    Ok(())
}

/// Coprocessor 0 opcode
fn op_cop0(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    match instruction.cop_opcode() {
        0b00000 => op_mfc0(bus, instruction),
        0b00100 => op_mtc0(bus, instruction),
        0b10000 => op_rfe(bus, instruction),
        n => Err(PsxError::Unimplemented(format!(
            "Cop0 instruction 0b{:05b}",
            n
        ))),
    }
}

/// Move To Coprocessor 0
fn op_mtc0(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let cpu_r = instruction.t();
    let cop_r = instruction.d();

    let v = bus.cpu.reg(cpu_r);

    bus.cpu.delayed_load();

    cop0::mtc0(bus, cop_r, v)
}

/// Move From Coprocessor 0
fn op_mfc0(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let cpu_r = instruction.t();
    let cop_r = instruction.d();

    let v = cop0::mfc0(bus, cop_r)?;

    // Coprocessor reads go through the load delay slot like memory loads
    bus.cpu.delayed_load_chain(cpu_r, v);

    Ok(())
}

/// Return From Exception. Doesn't actually jump anywhere but tells the coprocessor to return to
/// the mode it was in when the exception occurred.
fn op_rfe(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    // There are other instructions with the same encoding, but they're all virtual memory
    // related and the PlayStation doesn't implement them
    if instruction.0 & 0x3f != 0b01_0000 {
        return Err(PsxError::Unimplemented(format!(
            "Invalid cop0 instruction {}",
            instruction
        )));
    }

    cop0::return_from_exception(bus);

    Ok(())
}

/// Coprocessor 1 opcode (does not exist on the PlayStation)
fn op_cop1(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered Cop1 instruction");

    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Coprocessor 2 opcode (GTE). The GTE is not part of this machine.
fn op_cop2(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let _ = bus;

    Err(PsxError::Unimplemented(format!(
        "GTE instruction {}",
        instruction
    )))
}

/// Coprocessor 3 opcode (does not exist on the PlayStation)
fn op_cop3(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered Cop3 instruction");

    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Load Byte (signed)
fn op_lb(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    let v = load::<u8>(bus, addr)?;

    // Cast as i8 to force sign extension
    let v = v as i8;

    // Put the load in the delay slot
    bus.cpu.delayed_load_chain(t, v as u32);

    Ok(())
}

/// Load Halfword (signed)
fn op_lh(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    // Address must be 16bit aligned
    if addr % 2 == 0 {
        let v = load::<u16>(bus, addr)?;

        // Cast as i16 to force sign extension
        let v = v as i16;

        // Put the load in the delay slot
        bus.cpu.delayed_load_chain(t, v as u32);
    } else {
        bus.cpu.delayed_load();
        exception(bus, Exception::LoadAddressError);
    }

    Ok(())
}

/// Load Word Left
fn op_lwl(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    let mut cur_v = bus.cpu.reg(t);

    // This instruction bypasses the load delay restriction: it will merge the new contents with
    // the value currently being loaded if need be
    if let Some((pending_reg, pending_value)) = bus.cpu.load {
        if pending_reg == t {
            cur_v = pending_value;
        }
    }

    // Next we load the *aligned* word containing the first addressed byte
    let aligned_addr = addr & !3;
    let aligned_word = load::<u32>(bus, aligned_addr)?;

    // Depending on the address alignment we fetch the 1, 2, 3 or 4 *most* significant bytes and
    // put them in the target register
    let v = match addr & 3 {
        0 => (cur_v & 0x00ff_ffff) | (aligned_word << 24),
        1 => (cur_v & 0x0000_ffff) | (aligned_word << 16),
        2 => (cur_v & 0x0000_00ff) | (aligned_word << 8),
        3 => aligned_word,
        _ => unreachable!(),
    };

    // Put the load in the delay slot
    bus.cpu.delayed_load_chain(t, v);

    Ok(())
}

/// Load Word
fn op_lw(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    // Address must be 32bit aligned
    if addr % 4 == 0 {
        let v = load(bus, addr)?;

        bus.cpu.delayed_load_chain(t, v);
    } else {
        bus.cpu.delayed_load();
        exception(bus, Exception::LoadAddressError);
    }

    Ok(())
}

/// Load Byte Unsigned
fn op_lbu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    let v = load::<u8>(bus, addr)?;

    // Put the load in the delay slot
    bus.cpu.delayed_load_chain(t, u32::from(v));

    Ok(())
}

/// Load Halfword Unsigned
fn op_lhu(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    // Address must be 16bit aligned
    if addr % 2 == 0 {
        let v = load::<u16>(bus, addr)?;

        // Put the load in the delay slot
        bus.cpu.delayed_load_chain(t, u32::from(v));
    } else {
        bus.cpu.delayed_load();
        exception(bus, Exception::LoadAddressError);
    }

    Ok(())
}

/// Load Word Right
fn op_lwr(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);

    let mut cur_v = bus.cpu.reg(t);

    // This instruction bypasses the load delay restriction: it will merge the new contents with
    // the value currently being loaded if need be
    if let Some((pending_reg, pending_value)) = bus.cpu.load {
        if pending_reg == t {
            cur_v = pending_value;
        }
    }

    // Next we load the *aligned* word containing the first addressed byte
    let aligned_addr = addr & !3;
    let aligned_word = load::<u32>(bus, aligned_addr)?;

    // Depending on the address alignment we fetch the 1, 2, 3 or 4 *least* significant bytes and
    // put them in the target register
    let v = match addr & 3 {
        0 => aligned_word,
        1 => (cur_v & 0xff00_0000) | (aligned_word >> 8),
        2 => (cur_v & 0xffff_0000) | (aligned_word >> 16),
        3 => (cur_v & 0xffff_ff00) | (aligned_word >> 24),
        _ => unreachable!(),
    };

    // Put the load in the delay slot
    bus.cpu.delayed_load_chain(t, v);

    Ok(())
}

/// Store Byte
fn op_sb(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);
    let v = bus.cpu.reg(t);

    bus.cpu.delayed_load();

    store(bus, addr, v as u8)
}

/// Store Halfword
fn op_sh(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);
    let v = bus.cpu.reg(t);

    bus.cpu.delayed_load();

    // Address must be 16bit aligned
    if addr % 2 == 0 {
        store(bus, addr, v as u16)
    } else {
        exception(bus, Exception::StoreAddressError);
        Ok(())
    }
}

/// Store Word Left
fn op_swl(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);
    let v = bus.cpu.reg(t);

    let aligned_addr = addr & !3;
    // Load the current value for the aligned word at the target address
    let cur = load::<u32>(bus, aligned_addr)?;

    let new = match addr & 3 {
        0 => (cur & 0xffff_ff00) | (v >> 24),
        1 => (cur & 0xffff_0000) | (v >> 16),
        2 => (cur & 0xff00_0000) | (v >> 8),
        3 => v,
        _ => unreachable!(),
    };

    bus.cpu.delayed_load();

    store(bus, aligned_addr, new)
}

/// Store Word
fn op_sw(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);
    let v = bus.cpu.reg(t);

    bus.cpu.delayed_load();

    // Address must be 32bit aligned
    if addr % 4 == 0 {
        store(bus, addr, v)
    } else {
        exception(bus, Exception::StoreAddressError);
        Ok(())
    }
}

/// Store Word Right
fn op_swr(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let i = instruction.imm_se();
    let t = instruction.t();
    let s = instruction.s();

    let addr = bus.cpu.reg(s).wrapping_add(i);
    let v = bus.cpu.reg(t);

    let aligned_addr = addr & !3;
    // Load the current value for the aligned word at the target address
    let cur = load::<u32>(bus, aligned_addr)?;

    let new = match addr & 3 {
        0 => v,
        1 => (cur & 0x0000_00ff) | (v << 8),
        2 => (cur & 0x0000_ffff) | (v << 16),
        3 => (cur & 0x00ff_ffff) | (v << 24),
        _ => unreachable!(),
    };

    bus.cpu.delayed_load();

    store(bus, aligned_addr, new)
}

/// Load Word in Coprocessor 0
fn op_lwc0(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered LWC0 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Load Word in Coprocessor 1
fn op_lwc1(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered LWC1 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Load Word in Coprocessor 2
fn op_lwc2(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let _ = bus;

    Err(PsxError::Unimplemented(format!(
        "LWC2 instruction {}",
        instruction
    )))
}

/// Load Word in Coprocessor 3
fn op_lwc3(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered LWC3 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Store Word in Coprocessor 0
fn op_swc0(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered SWC0 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Store Word in Coprocessor 1
fn op_swc1(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered SWC1 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Store Word in Coprocessor 2
fn op_swc2(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    let _ = bus;

    Err(PsxError::Unimplemented(format!(
        "SWC2 instruction {}",
        instruction
    )))
}

/// Store Word in Coprocessor 3
fn op_swc3(bus: &mut Bus, _: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!("Encountered SWC3 instruction");

    // Not supported by this coprocessor
    exception(bus, Exception::CoprocessorError);

    Ok(())
}

/// Illegal instruction
fn op_illegal(bus: &mut Bus, instruction: Instruction) -> Result<()> {
    bus.cpu.delayed_load();

    warn!(
        "Illegal instruction {} at PC 0x{:08x}!",
        instruction,
        bus.cpu.current_pc()
    );

    exception(bus, Exception::IllegalInstruction);

    Ok(())
}
