//! One routine per supported opcode family, wired together
//! by a single dispatch table.

pub mod arith;
pub mod control;
pub mod data;
pub mod shift;
pub mod string;

use crate::decode::{DecodedInstruction, Opcode};
use crate::emulator::Emulator;
use crate::error::{EmuError, EmuResult};

pub fn dispatch(emu: &mut Emulator, instr: &DecodedInstruction) -> EmuResult<()> {
    match instr.opcode {
        Opcode::Mov => data::mov(emu, instr),
        Opcode::Push => data::push(emu, instr),
        Opcode::Pop => data::pop(emu, instr),
        Opcode::Lea => data::lea(emu, instr),
        Opcode::Xchg => data::xchg(emu, instr),
        Opcode::Pushad => data::pushad(emu, instr),
        Opcode::Popad => data::popad(emu, instr),
        Opcode::Clc => data::clc(emu),
        Opcode::Stc => data::stc(emu),
        Opcode::Cld => data::cld(emu),
        Opcode::Std => data::std_(emu),
        Opcode::Nop => Ok(()),

        Opcode::Add => arith::add(emu, instr),
        Opcode::Sub => arith::sub(emu, instr),
        Opcode::Adc => arith::adc(emu, instr),
        Opcode::Sbb => arith::sbb(emu, instr),
        Opcode::Cmp => arith::cmp(emu, instr),
        Opcode::And => arith::and(emu, instr),
        Opcode::Or => arith::or(emu, instr),
        Opcode::Xor => arith::xor(emu, instr),
        Opcode::Test => arith::test(emu, instr),
        Opcode::Inc => arith::inc(emu, instr),
        Opcode::Dec => arith::dec(emu, instr),

        Opcode::Shl => shift::shl(emu, instr),
        Opcode::Shr => shift::shr(emu, instr),
        Opcode::Rol => shift::rol(emu, instr),
        Opcode::Ror => shift::ror(emu, instr),

        Opcode::Lods(w) => string::lods(emu, w),
        Opcode::Stos(w) => string::stos(emu, w),
        Opcode::Movs(w) => string::movs(emu, w),
        Opcode::Scas(w) => string::scas(emu, w),

        Opcode::Jmp => control::jmp(emu, instr),
        Opcode::Jcc(cond) => control::jcc(emu, instr, cond),
        Opcode::Loop => control::loop_(emu, instr),
        Opcode::Call => control::call(emu, instr),
        Opcode::Ret => control::ret(emu, instr),

        Opcode::RepPrefix(_) | Opcode::LockPrefix => Ok(()),
        Opcode::Invalid => Err(EmuError::Decode(emu.eip)),
    }
}
