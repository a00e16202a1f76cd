//! A narrow, literal x86 decoder covering exactly the opcode and addressing
//! forms the dispatcher knows how to execute. Not a general-purpose
//! disassembler: unsupported encodings decode to `Opcode::Invalid` rather
//! than growing the table indefinitely.

#[cfg(test)]
#[path = "./x86_test.rs"]
mod x86_test;

use super::{Cond, DecodedInstruction, Decoder, Operand, Opcode, RepMode};
use crate::error::{EmuError, EmuResult};
use crate::registers::{byte_view_for_encoding, view_for_width, Reg, RegisterView, Width};

/// the ALU-group opcodes that share the `00+8n .. 05+8n` encoding pattern
const ALU_GROUP: [Opcode; 8] = [
    Opcode::Add, Opcode::Or, Opcode::Adc, Opcode::Sbb,
    Opcode::And, Opcode::Sub, Opcode::Xor, Opcode::Cmp,
];

/// the shift/rotate-group opcodes selected by ModRM.reg in the 0xC0/C1/D0-D3 forms
fn shift_group_op(reg_field: u8) -> Option<Opcode> {
    match reg_field {
        0 => Some(Opcode::Rol),
        1 => Some(Opcode::Ror),
        4 | 6 => Some(Opcode::Shl),
        5 => Some(Opcode::Shr),
        _ => None, // RCL/RCR/SAR: out of scope
    }
}

struct ModRm {
    reg_field: u8,
    rm: Operand,
    consumed: usize,
}

fn sign_extend_8(b: u8) -> i32 {
    b as i8 as i32
}

fn read_i32_le(bytes: &[u8], pos: usize) -> EmuResult<i32> {
    if pos + 4 > bytes.len() {
        return Err(EmuError::Decode(pos as u32));
    }
    Ok(i32::from_le_bytes([bytes[pos], bytes[pos + 1], bytes[pos + 2], bytes[pos + 3]]))
}

fn read_i16_le(bytes: &[u8], pos: usize) -> EmuResult<i32> {
    if pos + 2 > bytes.len() {
        return Err(EmuError::Decode(pos as u32));
    }
    Ok(i16::from_le_bytes([bytes[pos], bytes[pos + 1]]) as i32)
}

/// decodes the ModRM byte (and, for memory operands, the trailing SIB/disp
/// bytes) starting at `bytes[pos]`. `width` is the operand width for both
/// the register-field view and a register-direct rm.
fn decode_modrm(bytes: &[u8], pos: usize, width: Width) -> EmuResult<ModRm> {
    if pos >= bytes.len() {
        return Err(EmuError::Decode(pos as u32));
    }
    let modrm = bytes[pos];
    let md = modrm >> 6;
    let reg_field = (modrm >> 3) & 0x7;
    let rm_field = modrm & 0x7;
    let mut cursor = pos + 1;

    if md == 3 {
        let rm = reg_view(rm_field, width);
        return Ok(ModRm { reg_field, rm: Operand::Register(rm), consumed: cursor - pos });
    }

    let (mut base, mut index, mut scale) = (RegisterView::NONE, RegisterView::NONE, 0u32);
    let mut base_is_none = false;

    if rm_field == 4 {
        if cursor >= bytes.len() {
            return Err(EmuError::Decode(cursor as u32));
        }
        let sib = bytes[cursor];
        cursor += 1;
        let sib_scale = 1u32 << (sib >> 6);
        let sib_index = (sib >> 3) & 0x7;
        let sib_base = sib & 0x7;
        if sib_index != 4 {
            index = RegisterView::full(Reg::from_encoding(sib_index));
            scale = sib_scale;
        }
        if sib_base == 5 && md == 0 {
            base_is_none = true;
        } else {
            base = RegisterView::full(Reg::from_encoding(sib_base));
        }
    } else if rm_field == 5 && md == 0 {
        base_is_none = true;
    } else {
        base = RegisterView::full(Reg::from_encoding(rm_field));
    }

    let disp = match md {
        0 => {
            if base_is_none {
                let d = read_i32_le(bytes, cursor)?;
                cursor += 4;
                d
            } else {
                0
            }
        }
        1 => {
            let d = sign_extend_8(*bytes.get(cursor).ok_or(EmuError::Decode(cursor as u32))?);
            cursor += 1;
            d
        }
        2 => {
            let d = read_i32_le(bytes, cursor)?;
            cursor += 4;
            d
        }
        _ => unreachable!("mod==3 handled above"),
    };

    let rm = Operand::Memory { base, index, scale, disp, size: width };
    Ok(ModRm { reg_field, rm, consumed: cursor - pos })
}

fn reg_view(encoding: u8, width: Width) -> RegisterView {
    view_for_width(encoding, width)
}

/// The concrete decoder shipped with the crate, fulfilling the `Decoder`
/// contract for the opcode set the dispatcher executes.
pub struct X86Decoder;

impl X86Decoder {
    pub fn new() -> X86Decoder {
        X86Decoder
    }
}

impl Default for X86Decoder {
    fn default() -> Self {
        X86Decoder::new()
    }
}

impl Decoder for X86Decoder {
    fn decode_one(&self, bytes: &[u8], pc: u32) -> EmuResult<DecodedInstruction> {
        // REP/REPE/REPNE/LOCK are each their own one-byte pseudo-instruction
        // that just latches a flag and returns; only the operand-size
        // override is folded into the instruction it prefixes.
        let mut pos = 0usize;
        let mut op_size_16 = false;

        while *bytes.get(pos).ok_or(EmuError::Decode(pc))? == 0x66 {
            op_size_16 = true;
            pos += 1;
        }

        let lead = *bytes.get(pos).ok_or(EmuError::Decode(pc))?;
        let prefix_opcode = match lead {
            0xF0 => Some(Opcode::LockPrefix),
            0xF2 => Some(Opcode::RepPrefix(RepMode::Repne)),
            0xF3 => Some(Opcode::RepPrefix(RepMode::Repe)),
            _ => None,
        };
        if let Some(opcode) = prefix_opcode {
            return Ok(DecodedInstruction {
                opcode,
                len: (pos + 1) as u32,
                op_size_16,
                addr_size_16: false,
                dst: Operand::None,
                src: Operand::None,
                src2: Operand::None,
            });
        }

        let dword = if op_size_16 { Width::Word } else { Width::Dword };
        let opcode_byte = *bytes.get(pos).ok_or(EmuError::Decode(pc))?;
        pos += 1;

        let finish = |opcode: Opcode, dst: Operand, src: Operand, src2: Operand, pos: usize| {
            Ok(DecodedInstruction {
                opcode,
                len: pos as u32,
                op_size_16,
                addr_size_16: false,
                dst,
                src,
                src2,
            })
        };

        // ALU group: 00+8n..05+8n for n in 0..8
        if opcode_byte < 0x40 && (opcode_byte & 0x7) <= 5 && ALU_GROUP_START.contains(&(opcode_byte & !0x7)) {
            let op = ALU_GROUP[(opcode_byte >> 3) as usize];
            let variant = opcode_byte & 0x7;
            return match variant {
                0 => {
                    let m = decode_modrm(bytes, pos, Width::Byte)?;
                    let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                    pos += m.consumed;
                    finish(op, m.rm, reg, Operand::None, pos)
                }
                1 => {
                    let m = decode_modrm(bytes, pos, dword)?;
                    let reg = Operand::Register(reg_view(m.reg_field, dword));
                    pos += m.consumed;
                    finish(op, m.rm, reg, Operand::None, pos)
                }
                2 => {
                    let m = decode_modrm(bytes, pos, Width::Byte)?;
                    let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                    pos += m.consumed;
                    finish(op, reg, m.rm, Operand::None, pos)
                }
                3 => {
                    let m = decode_modrm(bytes, pos, dword)?;
                    let reg = Operand::Register(reg_view(m.reg_field, dword));
                    pos += m.consumed;
                    finish(op, reg, m.rm, Operand::None, pos)
                }
                4 => {
                    let imm = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                    pos += 1;
                    finish(op, Operand::Register(RegisterView::low_byte(Reg::Eax)), Operand::Immediate(imm), Operand::None, pos)
                }
                5 => {
                    let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                    pos += if op_size_16 { 2 } else { 4 };
                    finish(op, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(imm), Operand::None, pos)
                }
                _ => unreachable!(),
            };
        }

        match opcode_byte {
            0x0F => {
                let b2 = *bytes.get(pos).ok_or(EmuError::Decode(pc))?;
                pos += 1;
                if (0x80..=0x8F).contains(&b2) {
                    let d = read_i32_le(bytes, pos)?;
                    pos += 4;
                    return finish(Opcode::Jcc(cond_from_tttn(b2 & 0xF)), Operand::None, Operand::Relative(d), Operand::None, pos);
                }
                finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos)
            }

            0x40..=0x47 => finish(Opcode::Inc, Operand::Register(RegisterView::full(Reg::from_encoding(opcode_byte - 0x40))), Operand::None, Operand::None, pos),
            0x48..=0x4F => finish(Opcode::Dec, Operand::Register(RegisterView::full(Reg::from_encoding(opcode_byte - 0x48))), Operand::None, Operand::None, pos),
            0x50..=0x57 => finish(Opcode::Push, Operand::Register(RegisterView::full(Reg::from_encoding(opcode_byte - 0x50))), Operand::None, Operand::None, pos),
            0x58..=0x5F => finish(Opcode::Pop, Operand::Register(RegisterView::full(Reg::from_encoding(opcode_byte - 0x58))), Operand::None, Operand::None, pos),

            0x60 => finish(Opcode::Pushad, Operand::None, Operand::None, Operand::None, pos),
            0x61 => finish(Opcode::Popad, Operand::None, Operand::None, Operand::None, pos),

            0x68 => {
                let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                pos += if op_size_16 { 2 } else { 4 };
                finish(Opcode::Push, Operand::Immediate(imm), Operand::None, Operand::None, pos)
            }
            0x6A => {
                let imm = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(Opcode::Push, Operand::Immediate(imm), Operand::None, Operand::None, pos)
            }

            0x70..=0x7F => {
                let disp = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(Opcode::Jcc(cond_from_tttn(opcode_byte & 0xF)), Operand::None, Operand::Relative(disp), Operand::None, pos)
            }

            0x80 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                pos += m.consumed;
                let imm = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(ALU_GROUP[m.reg_field as usize], m.rm, Operand::Immediate(imm), Operand::None, pos)
            }
            0x81 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                pos += if op_size_16 { 2 } else { 4 };
                finish(ALU_GROUP[m.reg_field as usize], m.rm, Operand::Immediate(imm), Operand::None, pos)
            }
            0x83 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                let imm = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(ALU_GROUP[m.reg_field as usize], m.rm, Operand::Immediate(imm), Operand::None, pos)
            }

            0x84 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                pos += m.consumed;
                finish(Opcode::Test, m.rm, reg, Operand::None, pos)
            }
            0x85 => {
                let m = decode_modrm(bytes, pos, dword)?;
                let reg = Operand::Register(reg_view(m.reg_field, dword));
                pos += m.consumed;
                finish(Opcode::Test, m.rm, reg, Operand::None, pos)
            }
            0x86 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                pos += m.consumed;
                finish(Opcode::Xchg, m.rm, reg, Operand::None, pos)
            }
            0x87 => {
                let m = decode_modrm(bytes, pos, dword)?;
                let reg = Operand::Register(reg_view(m.reg_field, dword));
                pos += m.consumed;
                finish(Opcode::Xchg, m.rm, reg, Operand::None, pos)
            }
            0x88 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                pos += m.consumed;
                finish(Opcode::Mov, m.rm, reg, Operand::None, pos)
            }
            0x89 => {
                let m = decode_modrm(bytes, pos, dword)?;
                let reg = Operand::Register(reg_view(m.reg_field, dword));
                pos += m.consumed;
                finish(Opcode::Mov, m.rm, reg, Operand::None, pos)
            }
            0x8A => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                let reg = Operand::Register(byte_view_for_encoding(m.reg_field));
                pos += m.consumed;
                finish(Opcode::Mov, reg, m.rm, Operand::None, pos)
            }
            0x8B => {
                let m = decode_modrm(bytes, pos, dword)?;
                let reg = Operand::Register(reg_view(m.reg_field, dword));
                pos += m.consumed;
                finish(Opcode::Mov, reg, m.rm, Operand::None, pos)
            }
            0x8D => {
                let m = decode_modrm(bytes, pos, dword)?;
                let reg = Operand::Register(reg_view(m.reg_field, dword));
                pos += m.consumed;
                finish(Opcode::Lea, reg, m.rm, Operand::None, pos)
            }

            0x90 => finish(Opcode::Nop, Operand::None, Operand::None, Operand::None, pos),

            0xA4 => finish(Opcode::Movs(Width::Byte), Operand::None, Operand::None, Operand::None, pos),
            0xA5 => finish(Opcode::Movs(dword), Operand::None, Operand::None, Operand::None, pos),
            0xA8 => {
                let imm = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(Opcode::Test, Operand::Register(RegisterView::low_byte(Reg::Eax)), Operand::Immediate(imm), Operand::None, pos)
            }
            0xA9 => {
                let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                pos += if op_size_16 { 2 } else { 4 };
                finish(Opcode::Test, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(imm), Operand::None, pos)
            }
            0xAA => finish(Opcode::Stos(Width::Byte), Operand::None, Operand::None, Operand::None, pos),
            0xAB => finish(Opcode::Stos(dword), Operand::None, Operand::None, Operand::None, pos),
            0xAC => finish(Opcode::Lods(Width::Byte), Operand::None, Operand::None, Operand::None, pos),
            0xAD => finish(Opcode::Lods(dword), Operand::None, Operand::None, Operand::None, pos),
            0xAE => finish(Opcode::Scas(Width::Byte), Operand::None, Operand::None, Operand::None, pos),
            0xAF => finish(Opcode::Scas(dword), Operand::None, Operand::None, Operand::None, pos),

            0xB0..=0xB7 => {
                let imm = *bytes.get(pos).ok_or(EmuError::Decode(pc))? as i32;
                pos += 1;
                finish(Opcode::Mov, Operand::Register(byte_view_for_encoding(opcode_byte - 0xB0)), Operand::Immediate(imm), Operand::None, pos)
            }
            0xB8..=0xBF => {
                let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                pos += if op_size_16 { 2 } else { 4 };
                finish(Opcode::Mov, Operand::Register(view_for_width(opcode_byte - 0xB8, dword)), Operand::Immediate(imm), Operand::None, pos)
            }

            0xC0 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                pos += m.consumed;
                let imm = *bytes.get(pos).ok_or(EmuError::Decode(pc))? as i32;
                pos += 1;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Immediate(imm), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }
            0xC1 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                let imm = *bytes.get(pos).ok_or(EmuError::Decode(pc))? as i32;
                pos += 1;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Immediate(imm), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }
            0xD0 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                pos += m.consumed;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Immediate(1), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }
            0xD1 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Immediate(1), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }
            0xD2 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                pos += m.consumed;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Register(RegisterView::low_byte(Reg::Ecx)), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }
            0xD3 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                match shift_group_op(m.reg_field) {
                    Some(op) => finish(op, m.rm, Operand::Register(RegisterView::low_byte(Reg::Ecx)), Operand::None, pos),
                    None => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
                }
            }

            0xC2 => {
                let imm = read_i16_le(bytes, pos)?;
                pos += 2;
                finish(Opcode::Ret, Operand::Immediate(imm), Operand::None, Operand::None, pos)
            }
            0xC3 => finish(Opcode::Ret, Operand::None, Operand::None, Operand::None, pos),

            0xC6 => {
                let m = decode_modrm(bytes, pos, Width::Byte)?;
                pos += m.consumed;
                let imm = *bytes.get(pos).ok_or(EmuError::Decode(pc))? as i32;
                pos += 1;
                finish(Opcode::Mov, m.rm, Operand::Immediate(imm), Operand::None, pos)
            }
            0xC7 => {
                let m = decode_modrm(bytes, pos, dword)?;
                pos += m.consumed;
                let imm = if op_size_16 { read_i16_le(bytes, pos)? } else { read_i32_le(bytes, pos)? };
                pos += if op_size_16 { 2 } else { 4 };
                finish(Opcode::Mov, m.rm, Operand::Immediate(imm), Operand::None, pos)
            }

            0xE2 => {
                let disp = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(Opcode::Loop, Operand::None, Operand::Relative(disp), Operand::None, pos)
            }
            0xE8 => {
                let d = read_i32_le(bytes, pos)?;
                pos += 4;
                finish(Opcode::Call, Operand::None, Operand::Relative(d), Operand::None, pos)
            }
            0xE9 => {
                let d = read_i32_le(bytes, pos)?;
                pos += 4;
                finish(Opcode::Jmp, Operand::None, Operand::Relative(d), Operand::None, pos)
            }
            0xEB => {
                let d = sign_extend_8(*bytes.get(pos).ok_or(EmuError::Decode(pc))?);
                pos += 1;
                finish(Opcode::Jmp, Operand::None, Operand::Relative(d), Operand::None, pos)
            }

            0xF8 => finish(Opcode::Clc, Operand::None, Operand::None, Operand::None, pos),
            0xF9 => finish(Opcode::Stc, Operand::None, Operand::None, Operand::None, pos),
            0xFC => finish(Opcode::Cld, Operand::None, Operand::None, Operand::None, pos),
            0xFD => finish(Opcode::Std, Operand::None, Operand::None, Operand::None, pos),

            _ => finish(Opcode::Invalid, Operand::None, Operand::None, Operand::None, pos),
        }
    }
}

/// base opcodes of the eight ALU-group rows (`n << 3` for n in 0..8)
const ALU_GROUP_START: [u8; 8] = [0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38];

fn cond_from_tttn(tttn: u8) -> Cond {
    match tttn {
        0x0 => Cond::O,
        0x1 => Cond::No,
        0x2 => Cond::C,
        0x3 => Cond::Nc,
        0x4 => Cond::Z,
        0x5 => Cond::Nz,
        0x6 => Cond::Be,
        0x7 => Cond::A,
        0x8 => Cond::S,
        0x9 => Cond::Ns,
        0xA => Cond::P,
        0xB => Cond::Np,
        0xC => Cond::L,
        0xD => Cond::Ge,
        0xE => Cond::Le,
        0xF => Cond::G,
        _ => unreachable!("tttn is a 4-bit field"),
    }
}
