//! SHL/SHR/ROL/ROR. SHL/SHR set SF/ZF/PF from the shifted result, matching
//! real Intel semantics; ROL/ROR leave them untouched, affecting only CF
//! and, for a count of exactly 1, OF.

#[cfg(test)]
#[path = "./shift_test.rs"]
mod shift_test;

use crate::decode::DecodedInstruction;
use crate::emulator::Emulator;
use crate::error::EmuResult;
use crate::flags::{FLAG_CF, FLAG_OF};

fn shift_count(emu: &Emulator, instr: &DecodedInstruction) -> EmuResult<(u32, bool)> {
    let raw = emu.read_operand(&instr.src)?;
    let w = emu.operand_width(&instr.dst);
    let c = raw & 0x1F;
    let largeshift = raw >= w.carry_bit();
    Ok((c, largeshift))
}

pub fn shl(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = emu.operand_width(&instr.dst);
    let (c, largeshift) = shift_count(emu, instr)?;
    if c == 0 {
        return Ok(());
    }
    let src = emu.read_operand(&instr.dst)? as u64;
    let wide = src << c;
    let cf = (wide >> w.carry_bit()) & 1 != 0;
    let result = (wide as u32) & w.mask();

    emu.eflags.set_carry(cf);
    if c == 1 {
        let of = (result & (1 << w.sign_bit()) != 0) ^ cf;
        emu.eflags.set_overflow_bit(of);
    } else {
        emu.eflags.defined &= !FLAG_OF;
    }
    if largeshift {
        emu.eflags.defined &= !FLAG_CF;
    }
    emu.eflags.set_sign_zero_parity(result, w);
    emu.write_operand(&instr.dst, result)
}

pub fn shr(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = emu.operand_width(&instr.dst);
    let (c, largeshift) = shift_count(emu, instr)?;
    if c == 0 {
        return Ok(());
    }
    let src = emu.read_operand(&instr.dst)?;
    let old_msb = src & (1 << w.sign_bit()) != 0;
    let intermediate = src >> (c - 1);
    let cf = intermediate & 1 != 0;
    let result = (intermediate >> 1) & w.mask();

    emu.eflags.set_carry(cf);
    if c == 1 {
        emu.eflags.set_overflow_bit(old_msb);
    } else {
        emu.eflags.defined &= !FLAG_OF;
    }
    if largeshift {
        emu.eflags.defined &= !FLAG_CF;
    }
    emu.eflags.set_sign_zero_parity(result, w);
    emu.write_operand(&instr.dst, result)
}

pub fn rol(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = emu.operand_width(&instr.dst);
    let raw = emu.read_operand(&instr.src)?;
    let bits = w.carry_bit();
    let c = raw % bits;
    if c == 0 {
        return Ok(());
    }
    let src = emu.read_operand(&instr.dst)? & w.mask();
    let result = ((src << c) | (src >> (bits - c))) & w.mask();

    let cf = result & 1 != 0;
    emu.eflags.set_carry(cf);
    if c == 1 {
        let of = (result & (1 << w.sign_bit()) != 0) ^ cf;
        emu.eflags.set_overflow_bit(of);
    } else {
        emu.eflags.defined &= !FLAG_OF;
    }
    emu.write_operand(&instr.dst, result)
}

pub fn ror(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let w = emu.operand_width(&instr.dst);
    let raw = emu.read_operand(&instr.src)?;
    let bits = w.carry_bit();
    let c = raw % bits;
    if c == 0 {
        return Ok(());
    }
    let src = emu.read_operand(&instr.dst)? & w.mask();
    let result = ((src >> c) | (src << (bits - c))) & w.mask();

    let msb = result & (1 << w.sign_bit()) != 0;
    emu.eflags.set_carry(msb);
    if c == 1 {
        let second_msb = result & (1 << (w.sign_bit() - 1)) != 0;
        emu.eflags.set_overflow_bit(msb ^ second_msb);
    } else {
        emu.eflags.defined &= !FLAG_OF;
    }
    emu.write_operand(&instr.dst, result)
}
