#![allow(dead_code)]

#[macro_use]
extern crate quick_error;

#[cfg(test)]
extern crate pretty_assertions;

pub mod cache;
pub mod decode;
pub mod emulator;
pub mod error;
pub mod flags;
pub mod ops;
pub mod registers;
pub mod vmm;

pub use crate::emulator::{Emulator, PeHookData, StepOutcome};
pub use crate::error::{EmuError, EmuResult};
