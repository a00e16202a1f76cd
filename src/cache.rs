//! The decoded-instruction cache.
//!
//! Direct-mapped, power-of-two slot array keyed by `hash32(pc) mod N` using
//! the Wang 32-bit mix. `fetch` always redecodes into the slot it lands on
//! rather than trusting a prior occupant, so self-modifying code at the
//! same address is always reflected on the next fetch; the cache only
//! saves the decode's hash/index bookkeeping, not the decode itself.

#[cfg(test)]
#[path = "./cache_test.rs"]
mod cache_test;

use crate::decode::{DecodedInstruction, Decoder};
use crate::error::EmuResult;
use crate::vmm::Vmm;

const SLOT_COUNT: usize = 1024;
const SLOT_MASK: u32 = (SLOT_COUNT - 1) as u32;

/// the longest instruction this decoder ever needs a byte window for
const MAX_INSTRUCTION_LEN: usize = 16;

fn wang_hash32(mut k: u32) -> u32 {
    k = (!k).wrapping_add(k << 15);
    k ^= k >> 12;
    k = k.wrapping_add(k << 2);
    k ^= k >> 4;
    k = k.wrapping_mul(2057); // k + (k<<3) + (k<<11)
    k ^= k >> 16;
    k
}

pub struct DecodedInstructionCache {
    slots: Vec<Option<DecodedInstruction>>,
}

impl DecodedInstructionCache {
    pub fn new() -> DecodedInstructionCache {
        DecodedInstructionCache { slots: vec![None; SLOT_COUNT] }
    }

    pub fn clear(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }

    /// decodes the instruction at `pc` and stores it in its direct-mapped
    /// slot, unconditionally, then returns it by value.
    pub fn fetch(
        &mut self,
        pc: u32,
        vmm: &dyn Vmm,
        decoder: &dyn Decoder,
    ) -> EmuResult<DecodedInstruction> {
        let window = vmm.read_buf(pc, MAX_INSTRUCTION_LEN)?;
        let decoded = decoder.decode_one(&window, pc)?;
        let index = (wang_hash32(pc) & SLOT_MASK) as usize;
        self.slots[index] = Some(decoded.clone());
        Ok(decoded)
    }
}

impl Default for DecodedInstructionCache {
    fn default() -> Self {
        DecodedInstructionCache::new()
    }
}
