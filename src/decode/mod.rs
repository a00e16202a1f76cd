//! The decoder contract and the shared operand/instruction
//! record types it produces.

pub mod x86;

use std::fmt;

use crate::error::EmuResult;
use crate::registers::{RegisterView, Width};

/// Which condition an `Opcode::Jcc` tests.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cond {
    O, No, C, Nc, Z, Nz, Be, A, S, Ns, P, Np, L, Ge, Le, G,
}

/// A latched string-repeat prefix.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RepMode {
    Repe,
    Repne,
}

/// The opcode identifiers the dispatcher understands.
/// This is a narrow subset of the instruction set: exactly the families the
/// opcode-semantics sections name, not a general ISA.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Opcode {
    Mov,
    Push,
    Pop,
    Inc,
    Dec,
    Add,
    Sub,
    Adc,
    Sbb,
    Cmp,
    And,
    Or,
    Xor,
    Test,
    Lea,
    Xchg,
    Pushad,
    Popad,
    Clc,
    Stc,
    Cld,
    Std,
    Nop,
    Shl,
    Shr,
    Rol,
    Ror,
    Lods(Width),
    Stos(Width),
    Movs(Width),
    Scas(Width),
    Jmp,
    Jcc(Cond),
    Loop,
    Call,
    Ret,
    RepPrefix(RepMode),
    LockPrefix,
    /// bytes that do not form a recognized instruction at this position
    Invalid,
}

impl Opcode {
    /// true for the REP/REPE/REPNE/LOCK pseudo-opcodes that latch a prefix
    /// flag and return without clearing it
    pub fn is_prefix(&self) -> bool {
        matches!(self, Opcode::RepPrefix(_) | Opcode::LockPrefix)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// One decoded operand slot.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Operand {
    Register(RegisterView),
    Memory { base: RegisterView, index: RegisterView, scale: u32, disp: i32, size: Width },
    Immediate(i32),
    Relative(i32),
    None,
}

impl Operand {
    pub fn is_none(&self) -> bool {
        matches!(self, Operand::None)
    }
}

/// A fully decoded instruction.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedInstruction {
    pub opcode: Opcode,
    pub len: u32,
    pub op_size_16: bool,
    pub addr_size_16: bool,
    pub dst: Operand,
    pub src: Operand,
    pub src2: Operand,
}

impl DecodedInstruction {
    pub fn invalid(len: u32) -> DecodedInstruction {
        DecodedInstruction {
            opcode: Opcode::Invalid,
            len,
            op_size_16: false,
            addr_size_16: false,
            dst: Operand::None,
            src: Operand::None,
            src2: Operand::None,
        }
    }
}

/// The instruction-decoder contract consumed by the fetch path.
///
/// `decode_one` is given a byte window starting at `pc` (the core supplies
/// enough trailing bytes to cover the longest instruction it can encode) and
/// returns the decoded record plus its length in bytes.
pub trait Decoder {
    fn decode_one(&self, bytes: &[u8], pc: u32) -> EmuResult<DecodedInstruction>;
}
