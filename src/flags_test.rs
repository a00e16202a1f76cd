use super::*;
use crate::registers::Width;
use pretty_assertions::assert_eq;

#[test]
fn addsub_add_sets_carry_on_byte_overflow() {
    let mut f = EFlags::new();
    f.calc_flags_addsub(0xFF, 0x01, Width::Byte, false);
    assert!(f.carry());
    assert!(f.zero());
    assert!(f.is_defined(FLAG_CF | FLAG_ZF | FLAG_OF | FLAG_SF | FLAG_PF | FLAG_AF));
}

#[test]
fn addsub_sub_sets_borrow_when_minuend_smaller() {
    let mut f = EFlags::new();
    f.calc_flags_addsub(0x00, 0x01, Width::Byte, true);
    assert!(f.carry());
    assert!(f.sign());
    assert!(!f.zero());
}

#[test]
fn addsub_signed_overflow_on_add() {
    let mut f = EFlags::new();
    // 0x7F + 0x01 overflows a signed byte (127 + 1 = -128)
    f.calc_flags_addsub(0x7F, 0x01, Width::Byte, false);
    assert!(f.overflow());
    assert!(f.sign());
    assert!(!f.carry());
}

#[test]
fn calc_flags_test_clears_carry_and_overflow_and_undefines_adjust() {
    let mut f = EFlags::new();
    f.set_carry(true);
    f.calc_flags_test(0, Width::Dword);
    assert!(!f.carry());
    assert!(!f.overflow());
    assert!(f.zero());
    assert!(!f.is_defined(FLAG_AF));
}

#[test]
fn inc_does_not_touch_carry() {
    let mut f = EFlags::new();
    f.set_carry(true);
    f.calc_flags_inc(0x00, Width::Byte); // wrapped from 0xFF
    assert!(f.carry(), "INC must leave a previously-set CF untouched");
    assert!(f.zero());
}

#[test]
fn dec_of_zero_sets_sign_and_not_zero() {
    let mut f = EFlags::new();
    f.calc_flags_dec(0xFF, Width::Byte); // 0x00 - 1 wrapped
    assert!(f.sign());
    assert!(!f.zero());
}

#[test]
fn parity_flag_matches_even_bit_count_of_low_byte() {
    let mut f = EFlags::new();
    f.calc_flags_test(0b0000_0011, Width::Byte); // two bits set -> even parity
    assert!(f.parity());
    f.calc_flags_test(0b0000_0001, Width::Byte); // one bit set -> odd parity
    assert!(!f.parity());
}
