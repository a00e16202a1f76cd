use super::*;
use crate::decode::x86::X86Decoder;
use crate::emulator::{Emulator, PeHookData};
use crate::registers::Reg;
use crate::vmm::FlatVmm;
use pretty_assertions::assert_eq;

fn new_emulator() -> Emulator {
    let mut vmm = FlatVmm::new(0x0001_0000, 0x0040_0000);
    vmm.load_image(0, &[0u8; 0x100]).unwrap();
    let pe = PeHookData { address_of_entry_point: 0, size_of_stack_reserve: 0x1000 };
    Emulator::new(Box::new(vmm), Box::new(X86Decoder::new()), &pe).unwrap()
}

#[test]
fn movs_byte_copies_forward_and_advances_both_indices() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    emu.write_sized(base, Width::Byte, 0xAB).unwrap();
    emu.regs.set32(Reg::Esi, base);
    emu.regs.set32(Reg::Edi, base + 0x10);
    emu.regs.set32(Reg::Ecx, 1);

    movs(&mut emu, Width::Byte).unwrap();

    assert_eq!(emu.read_sized(base + 0x10, Width::Byte).unwrap(), 0xAB);
    assert_eq!(emu.regs.get32(Reg::Esi), base + 1);
    assert_eq!(emu.regs.get32(Reg::Edi), base + 0x11);
}

#[test]
fn movs_with_direction_flag_set_steps_backward() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    emu.eflags.set_direction(true);
    emu.regs.set32(Reg::Esi, base + 4);
    emu.regs.set32(Reg::Edi, base + 8);

    movs(&mut emu, Width::Dword).unwrap();

    assert_eq!(emu.regs.get32(Reg::Esi), base);
    assert_eq!(emu.regs.get32(Reg::Edi), base + 4);
}

#[test]
fn rep_movsb_copies_ecx_bytes_and_zeroes_ecx() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    for i in 0..4u32 {
        emu.write_sized(base + i, Width::Byte, i + 1).unwrap();
    }
    emu.regs.set32(Reg::Esi, base);
    emu.regs.set32(Reg::Edi, base + 0x20);
    emu.regs.set32(Reg::Ecx, 4);
    emu.prefix_repe = true;

    movs(&mut emu, Width::Byte).unwrap();

    assert_eq!(emu.regs.get32(Reg::Ecx), 0);
    for i in 0..4u32 {
        assert_eq!(emu.read_sized(base + 0x20 + i, Width::Byte).unwrap(), i + 1);
    }
}

#[test]
fn rep_with_ecx_already_zero_does_nothing() {
    let mut emu = new_emulator();
    emu.regs.set32(Reg::Ecx, 0);
    emu.regs.set32(Reg::Esi, 0x0040_0000);
    emu.regs.set32(Reg::Edi, 0x0040_0010);
    emu.prefix_repe = true;

    movs(&mut emu, Width::Dword).unwrap();

    assert_eq!(emu.regs.get32(Reg::Esi), 0x0040_0000);
    assert_eq!(emu.regs.get32(Reg::Edi), 0x0040_0010);
}

#[test]
fn repe_scas_stops_at_the_first_mismatch() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    emu.write_sized(base, Width::Byte, 5).unwrap();
    emu.write_sized(base + 1, Width::Byte, 5).unwrap();
    emu.write_sized(base + 2, Width::Byte, 9).unwrap();
    emu.regs.set32(Reg::Eax, 5);
    emu.regs.set32(Reg::Edi, base);
    emu.regs.set32(Reg::Ecx, 10);
    emu.prefix_repe = true;

    scas(&mut emu, Width::Byte).unwrap();

    assert_eq!(emu.regs.get32(Reg::Edi), base + 3);
    assert_eq!(emu.regs.get32(Reg::Ecx), 7);
    assert!(!emu.eflags.zero(), "SCAS must stop once it finds a byte that does not match AL");
}

#[test]
fn lods_reads_into_the_accumulator_view_for_the_given_width() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    emu.write_sized(base, Width::Word, 0x1234).unwrap();
    emu.regs.set32(Reg::Esi, base);

    lods(&mut emu, Width::Word).unwrap();

    assert_eq!(emu.regs.get32(Reg::Eax) & 0xFFFF, 0x1234);
    assert_eq!(emu.regs.get32(Reg::Esi), base + 2);
}

#[test]
fn stos_writes_the_accumulator_and_advances_edi() {
    let mut emu = new_emulator();
    let base = 0x0040_0000;
    emu.regs.set32(Reg::Eax, 0xDEAD_BEEF);
    emu.regs.set32(Reg::Edi, base);

    stos(&mut emu, Width::Dword).unwrap();

    assert_eq!(emu.read_sized(base, Width::Dword).unwrap(), 0xDEAD_BEEF);
    assert_eq!(emu.regs.get32(Reg::Edi), base + 4);
}
