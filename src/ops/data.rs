//! MOV/PUSH/POP/LEA/XCHG/PUSHAD/POPAD and the flag-bit set/clear opcodes.

#[cfg(test)]
#[path = "./data_test.rs"]
mod data_test;

use crate::decode::DecodedInstruction;
use crate::emulator::Emulator;
use crate::error::EmuResult;
use crate::registers::{Reg, RegisterView};

pub fn mov(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let v = emu.read_operand(&instr.src)?;
    emu.write_operand(&instr.dst, v)
}

pub fn push(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let v = emu.read_operand(&instr.dst)?;
    if instr.op_size_16 {
        emu.push16(v as u16)
    } else {
        emu.push32(v)
    }
}

pub fn pop(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let v = if instr.op_size_16 { emu.pop16()? as u32 } else { emu.pop32()? };
    emu.write_operand(&instr.dst, v)
}

pub fn lea(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    match instr.src {
        crate::decode::Operand::Memory { base, index, scale, disp, .. } => {
            let addr = emu.calc_addr(base, index, scale, disp);
            emu.write_operand(&instr.dst, addr)
        }
        _ => Err(crate::error::EmuError::OperandFault("LEA source is not a memory operand".into())),
    }
}

pub fn xchg(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let a = emu.read_operand(&instr.dst)?;
    let b = emu.read_operand(&instr.src)?;
    emu.write_operand(&instr.dst, b)?;
    emu.write_operand(&instr.src, a)
}

/// push EDI, ESI, EBP, ESP, EBX, EDX, ECX, EAX in that memory order
const PUSHAD_ORDER: [Reg; 8] =
    [Reg::Edi, Reg::Esi, Reg::Ebp, Reg::Esp, Reg::Ebx, Reg::Edx, Reg::Ecx, Reg::Eax];

/// each `push` decrements ESP before writing, so the register pushed *last*
/// lands at the final, lowest ESP; iterating `PUSHAD_ORDER` in reverse here
/// puts EDI there, matching the documented memory order
pub fn pushad(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    for reg in PUSHAD_ORDER.iter().rev() {
        let v = emu.regs.read_view(&RegisterView::full(*reg));
        if instr.op_size_16 {
            emu.push16(v as u16)?;
        } else {
            emu.push32(v)?;
        }
    }
    Ok(())
}

/// pops LIFO in the order `pushad` wrote them (EDI first, off the final
/// ESP); the slot that would restore ESP is discarded, not written back
pub fn popad(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    for reg in PUSHAD_ORDER.iter() {
        let v = if instr.op_size_16 { emu.pop16()? as u32 } else { emu.pop32()? };
        if *reg == Reg::Esp {
            continue;
        }
        emu.regs.write_view(&RegisterView::full(*reg), v);
    }
    Ok(())
}

pub fn clc(emu: &mut Emulator) -> EmuResult<()> {
    emu.eflags.set_carry(false);
    Ok(())
}

pub fn stc(emu: &mut Emulator) -> EmuResult<()> {
    emu.eflags.set_carry(true);
    Ok(())
}

pub fn cld(emu: &mut Emulator) -> EmuResult<()> {
    emu.eflags.set_direction(false);
    Ok(())
}

pub fn std_(emu: &mut Emulator) -> EmuResult<()> {
    emu.eflags.set_direction(true);
    Ok(())
}
