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

fn instr(dst: Operand, src: Operand) -> DecodedInstruction {
    DecodedInstruction { opcode: Opcode::Add, len: 0, op_size_16: false, addr_size_16: false, dst, src, src2: Operand::None }
}

#[test]
fn add_al_0xff_with_al_1_carries_out_of_bit_seven() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 1);
    let i = instr(Operand::Register(RegisterView::low_byte(Reg::Eax)), Operand::Immediate(-1));

    add(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax) & 0xFF, 0);
    assert!(emu.eflags.carry(), "1 + 0xFF must carry out of an 8-bit destination");
    assert!(emu.eflags.zero());
}

#[test]
fn adc_bx_minus_one_under_word_width_carries_from_bit_fifteen() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Ebx, 1);
    let i = instr(Operand::Register(RegisterView::word(Reg::Ebx)), Operand::Immediate(-1));

    adc(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Ebx) & 0xFFFF, 0);
    assert!(emu.eflags.carry(), "1 + 0xFFFF must carry out of a 16-bit destination");
}

#[test]
fn add_dword_no_spurious_carry_when_sum_fits() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 5);
    let i = instr(Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(10));

    add(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 15);
    assert!(!emu.eflags.carry());
}

#[test]
fn sub_sets_borrow_on_byte_width_underflow() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 0);
    let i = instr(Operand::Register(RegisterView::low_byte(Reg::Eax)), Operand::Immediate(1));

    sub(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax) & 0xFF, 0xFF);
    assert!(emu.eflags.carry());
}

#[test]
fn cmp_does_not_write_back_the_destination() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 5);
    let i = instr(Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(5));

    cmp(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 5);
    assert!(emu.eflags.zero());
}

#[test]
fn and_clears_carry_and_overflow_and_undefines_adjust() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Eax, 0xFF);
    let i = instr(Operand::Register(RegisterView::full(Reg::Eax)), Operand::Immediate(0x0F));

    and(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 0x0F);
    assert!(!emu.eflags.carry());
    assert!(!emu.eflags.overflow());
    assert!(!emu.eflags.is_defined(crate::flags::FLAG_AF));
}

#[test]
fn inc_leaves_carry_untouched() {
    let mut emu = new_emulator();
    emu.eflags.set_carry(true);
    emu.regs.set32(Reg::Eax, 0xFFFF_FFFF);
    let i = instr(Operand::Register(RegisterView::full(Reg::Eax)), Operand::None);

    inc(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax), 0);
    assert!(emu.eflags.zero());
    assert!(emu.eflags.carry(), "INC must not clear a previously-set CF");
}

#[test]
fn dec_of_one_clears_zero_flag() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Ecx, 1);
    let i = instr(Operand::Register(RegisterView::full(Reg::Ecx)), Operand::None);

    dec(&mut emu, &i).unwrap();

    assert_eq!(emu.regs.get32(Reg::Ecx), 0);
    assert!(emu.eflags.zero());
}
