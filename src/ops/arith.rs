//! ADD/SUB/ADC/SBB/CMP/AND/OR/XOR/TEST/INC/DEC.
//!
//! All of these compute flags from the destination operand's width: a
//! register view's own width, or the canonical memory access size recorded
//! on the decoded operand.

#[cfg(test)]
#[path = "./arith_test.rs"]
mod arith_test;

use crate::decode::DecodedInstruction;
use crate::emulator::Emulator;
use crate::error::EmuResult;

fn dst_width(emu: &Emulator, instr: &DecodedInstruction) -> crate::registers::Width {
    emu.operand_width(&instr.dst)
}

pub fn add(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    emu.eflags.calc_flags_addsub(a, b, w, false);
    emu.write_operand(&instr.dst, a.wrapping_add(b) & w.mask())
}

pub fn sub(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    emu.eflags.calc_flags_addsub(a, b, w, true);
    emu.write_operand(&instr.dst, a.wrapping_sub(b) & w.mask())
}

/// folds CF into the destination operand before the flag calculation, per
/// the documented deviation from strict Intel three-operand overflow rules.
pub fn adc(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    let cf = emu.eflags.carry() as u32;
    let a_plus_cf = a.wrapping_add(cf) & w.mask();
    emu.eflags.calc_flags_addsub(a_plus_cf, b, w, false);
    emu.write_operand(&instr.dst, a_plus_cf.wrapping_add(b) & w.mask())
}

pub fn sbb(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    let cf = emu.eflags.carry() as u32;
    let a_minus_cf = a.wrapping_sub(cf) & w.mask();
    emu.eflags.calc_flags_addsub(a_minus_cf, b, w, true);
    emu.write_operand(&instr.dst, a_minus_cf.wrapping_sub(b) & w.mask())
}

pub fn cmp(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    emu.eflags.calc_flags_addsub(a, b, w, true);
    Ok(())
}

pub fn and(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    let r = a & b & w.mask();
    emu.eflags.calc_flags_test(r, w);
    emu.write_operand(&instr.dst, r)
}

pub fn or(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    let r = (a | b) & w.mask();
    emu.eflags.calc_flags_test(r, w);
    emu.write_operand(&instr.dst, r)
}

pub fn xor(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    let r = (a ^ b) & w.mask();
    emu.eflags.calc_flags_test(r, w);
    emu.write_operand(&instr.dst, r)
}

pub fn test(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    emu.eflags.calc_flags_test(a & b & w.mask(), w);
    Ok(())
}

pub fn inc(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let r = a.wrapping_add(1) & w.mask();
    emu.eflags.calc_flags_inc(r, w);
    emu.write_operand(&instr.dst, r)
}

pub fn dec(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = dst_width(emu, instr);
    let a = emu.read_operand(&instr.dst)?;
    let r = a.wrapping_sub(1) & w.mask();
    emu.eflags.calc_flags_dec(r, w);
    emu.write_operand(&instr.dst, r)
}
