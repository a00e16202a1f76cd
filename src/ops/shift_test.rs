use super::*;
use crate::decode::{Operand, Opcode};
use crate::decode::x86::X86Decoder;
use crate::emulator::{Emulator, PeHookData};
use crate::registers::{Reg, RegisterView};
use crate::vmm::FlatVmm;
use pretty_assertions::assert_eq;

fn new_emulator() -> Emulator {
    let vmm = FlatVmm::new(0x0001_0000, 0x0040_0000);
    let pe = PeHookData { address_of_entry_point: 0, size_of_stack_reserve: 0x1000 };
    Emulator::new(Box::new(vmm), Box::new(X86Decoder::new()), &pe).unwrap()
}

fn instr(opcode: Opcode, dst: Operand, src: Operand) -> DecodedInstruction {
    DecodedInstruction { opcode, len: 0, op_size_16: false, addr_size_16: false, dst, src, src2: Operand::None }
}

#[test]
fn rol_by_a_multiple_of_the_operand_width_touches_no_flags() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 0x1234_5678);
    emu.eflags.set_carry(true);
    emu.eflags.set_overflow_bit(true);
    let i = instr(Opcode::Rol, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(32));

    rol(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 0x1234_5678, "a rotate by 32 on a 32-bit value is a no-op");
    assert!(emu.eflags.carry(), "ROL by an effective count of 0 must not touch CF");
    assert!(emu.eflags.overflow(), "ROL by an effective count of 0 must not touch OF");
}

#[test]
fn ror_by_a_multiple_of_the_operand_width_touches_no_flags() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Ebx, 0x1234_5678);
    emu.eflags.set_carry(false);
    let i = instr(Opcode::Ror, Operand::Register(RegisterView::full(Reg::Ebx)), Operand::Immediate(64));

    ror(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Ebx), 0x1234_5678);
    assert!(!emu.eflags.carry());
}

#[test]
fn rol_by_one_sets_cf_from_the_wrapped_bit_and_defines_of() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 0x8000_0001);
    let i = instr(Opcode::Rol, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(1));

    rol(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 0x0000_0003);
    assert!(emu.eflags.carry());
    assert!(emu.eflags.is_defined(crate::flags::FLAG_OF));
}

#[test]
fn rol_by_a_count_reducing_to_one_still_defines_of() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 0x8000_0001);
    // 33 % 32 == 1, so this must behave exactly like a rotate-by-one
    let i = instr(Opcode::Rol, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(33));

    rol(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 0x0000_0003);
    assert!(emu.eflags.is_defined(crate::flags::FLAG_OF), "an effective count of 1 must still define OF");
}

#[test]
fn shl_by_zero_leaves_flags_and_value_untouched() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 5);
    emu.eflags.set_carry(true);
    let i = instr(Opcode::Shl, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(0));

    shl(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 5);
    assert!(emu.eflags.carry());
}

#[test]
fn shr_by_one_sets_carry_from_the_dropped_bit() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 3);
    let i = instr(Opcode::Shr, Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(1));

    shr(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 1);
    assert!(emu.eflags.carry());
}
