//! JMP/Jcc/LOOP/CALL/RET and API-trap handling.

#[cfg(test)]
#[path = "./control_test.rs"]
mod control_test;

use crate::decode::{Cond, DecodedInstruction, Operand};
use crate::emulator::Emulator;
use crate::error::{EmuError, EmuResult};
use crate::registers::Reg;
use crate::vmm::ImportDesc;

fn branch_target(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<u32> {
    let target = match instr.src {
        Operand::Relative(disp) => emu.eip.wrapping_add(disp as u32),
        _ => emu.read_operand(&instr.src)?,
    };
    Ok(if instr.op_size_16 { target & 0xFFFF } else { target })
}

pub fn jmp(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    emu.eip = branch_target(emu, instr)?;
    Ok(())
}

fn cond_is_true(emu: &Emulator, cond: Cond) -> bool {
    let f = &emu.eflags;
    match cond {
        Cond::O => f.overflow(),
        Cond::No => !f.overflow(),
        Cond::C => f.carry(),
        Cond::Nc => !f.carry(),
        Cond::Z => f.zero(),
        Cond::Nz => !f.zero(),
        Cond::Be => f.carry() || f.zero(),
        Cond::A => !f.carry() && !f.zero(),
        Cond::S => f.sign(),
        Cond::Ns => !f.sign(),
        Cond::P => f.parity(),
        Cond::Np => !f.parity(),
        Cond::L => f.sign() != f.overflow(),
        Cond::Ge => f.sign() == f.overflow(),
        Cond::Le => f.zero() || (f.sign() != f.overflow()),
        Cond::G => !f.zero() && (f.sign() == f.overflow()),
    }
}

pub fn jcc(emu: &mut Emulator, instr: &DecodedInstruction, cond: Cond) -> EmuResult<()> {
    if cond_is_true(emu, cond) {
        emu.eip = branch_target(emu, instr)?;
    }
    Ok(())
}

pub fn loop_(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let ecx = emu.regs.get32(Reg::Ecx).wrapping_sub(1);
    emu.regs.set32(Reg::Ecx, ecx);
    if ecx != 0 {
        if let Operand::Relative(disp) = instr.src {
            emu.eip = emu.eip.wrapping_add(disp as u32);
        }
    }
    Ok(())
}

pub fn call(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let return_addr = emu.eip;
    let target = branch_target(emu, instr)?;
    emu.push32(return_addr)?;
    emu.eip = target;
    Ok(())
}

pub fn ret(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    let target = emu.pop32()?;
    emu.eip = target;
    if let Operand::Immediate(extra) = instr.dst {
        let esp = emu.regs.get32(Reg::Esp).wrapping_add(extra as u32);
        emu.regs.set32(Reg::Esp, esp);
    }
    Ok(())
}

/// the generic stdcall import-trap handler: pop the return
/// address into EIP, release `arg_bytes` of arguments, and set EAX.
pub fn run_import_trap(emu: &mut Emulator, desc: &ImportDesc) -> EmuResult<()> {
    if desc.is_varargs() {
        return Err(EmuError::UnsupportedImport(desc.description.clone()));
    }
    let return_addr = emu.pop32()?;
    emu.eip = return_addr;
    let esp = emu.regs.get32(Reg::Esp).wrapping_add(desc.arg_bytes);
    emu.regs.set32(Reg::Esp, esp);
    let eax = desc.handler_fn.map(|f| f()).unwrap_or(0);
    emu.regs.set32(Reg::Eax, eax);
    Ok(())
}
