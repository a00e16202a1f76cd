//! LODS/STOS/MOVS/SCAS and the REP/REPE/REPNE iteration harness.
//!
//! Address-size override (a 0x67 prefix selecting 16-bit index registers)
//! is not decoded by this crate; index registers are always the full
//! 32-bit ESI/EDI/ECX.

#[cfg(test)]
#[path = "./string_test.rs"]
mod string_test;

use crate::emulator::Emulator;
use crate::error::EmuResult;
use crate::registers::{accumulator_view, Reg, Width};

fn step_index(emu: &Emulator, reg: Reg, size: Width) -> u32 {
    let cur = emu.regs.get32(reg);
    if emu.eflags.direction() {
        cur.wrapping_sub(size.bytes())
    } else {
        cur.wrapping_add(size.bytes())
    }
}

/// true if the REP/REPE/REPNE pre-check says to skip the
/// body entirely: a latch is set and ECX is already zero
fn should_skip(emu: &Emulator) -> bool {
    (emu.prefix_repe || emu.prefix_repne) && emu.regs.get32(Reg::Ecx) == 0
}

/// decrements ECX and reports whether the REP loop should keep going
fn post_check(emu: &mut Emulator, zero_flag_terminates: bool) -> bool {
    if !(emu.prefix_repe || emu.prefix_repne) {
        return false;
    }
    let ecx = emu.regs.get32(Reg::Ecx).wrapping_sub(1);
    emu.regs.set32(Reg::Ecx, ecx);
    if ecx == 0 {
        return false;
    }
    if zero_flag_terminates {
        if emu.prefix_repe && !emu.eflags.zero() {
            return false;
        }
        if emu.prefix_repne && emu.eflags.zero() {
            return false;
        }
    }
    true
}

pub fn lods(emu: &mut Emulator, size: Width) -> EmuResult<()> {
    loop {
        if should_skip(emu) {
            return Ok(());
        }
        let esi = emu.regs.get32(Reg::Esi);
        let val = emu.read_sized(esi, size)?;
        emu.regs.write_view(&accumulator_view(size), val);
        emu.regs.set32(Reg::Esi, step_index(emu, Reg::Esi, size));
        if !post_check(emu, false) {
            return Ok(());
        }
    }
}

pub fn stos(emu: &mut Emulator, size: Width) -> EmuResult<()> {
    loop {
        if should_skip(emu) {
            return Ok(());
        }
        let edi = emu.regs.get32(Reg::Edi);
        let val = emu.regs.read_view(&accumulator_view(size));
        emu.write_sized(edi, size, val)?;
        emu.regs.set32(Reg::Edi, step_index(emu, Reg::Edi, size));
        if !post_check(emu, false) {
            return Ok(());
        }
    }
}

pub fn movs(emu: &mut Emulator, size: Width) -> EmuResult<()> {
    loop {
        if should_skip(emu) {
            return Ok(());
        }
        let esi = emu.regs.get32(Reg::Esi);
        let edi = emu.regs.get32(Reg::Edi);
        let val = emu.read_sized(esi, size)?;
        emu.write_sized(edi, size, val)?;
        emu.regs.set32(Reg::Esi, step_index(emu, Reg::Esi, size));
        emu.regs.set32(Reg::Edi, step_index(emu, Reg::Edi, size));
        if !post_check(emu, false) {
            return Ok(());
        }
    }
}

pub fn scas(emu: &mut Emulator, size: Width) -> EmuResult<()> {
    loop {
        if should_skip(emu) {
            return Ok(());
        }
        let edi = emu.regs.get32(Reg::Edi);
        let acc = emu.regs.read_view(&accumulator_view(size));
        let mem = emu.read_sized(edi, size)?;
        emu.eflags.calc_flags_addsub(acc, mem, size, true);
        emu.regs.set32(Reg::Edi, step_index(emu, Reg::Edi, size));
        if !post_check(emu, true) {
            return Ok(());
        }
    }
}
