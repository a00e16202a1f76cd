//! The fetch-decode-dispatch loop and emulator lifecycle.

#[cfg(test)]
#[path = "./emulator_test.rs"]
mod emulator_test;

use crate::cache::DecodedInstructionCache;
use crate::decode::{Decoder, Operand, Opcode, RepMode};
use crate::error::{EmuError, EmuResult};
use crate::flags::EFlags;
use crate::ops;
use crate::registers::{Reg, RegisterFile, RegisterView, Width};
use crate::vmm::{Vmm, MAPPING_END};

const DEBUG_FETCH: bool = false;
const DEBUG_DISPATCH: bool = false;
const DEBUG_STACK: bool = false;

/// Construction parameters carried on the PE optional header.
/// This crate's own stand-in for the PE loader's output: just the two
/// fields the emulator's constructor actually reads.
#[derive(Copy, Clone, Debug)]
pub struct PeHookData {
    pub address_of_entry_point: u32,
    pub size_of_stack_reserve: u32,
}

/// The typed success value of `step()`: "program exited" is a
/// distinct Ok case, not a sentinel error code.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Exited,
}

/// The emulator core: register file, flags, program counter, VMM handle,
/// decoded-instruction cache, and the two one-instruction prefix latches.
pub struct Emulator {
    pub regs: RegisterFile,
    pub eflags: EFlags,
    pub eip: u32,
    pub vmm: Box<dyn Vmm>,
    pub decoder: Box<dyn Decoder>,
    cache: DecodedInstructionCache,
    pub prefix_repe: bool,
    pub prefix_repne: bool,
}

impl Emulator {
    /// wires the VMM and PE data, allocates the stack, seeds the sentinel
    /// return address, and sets EIP to the entry point.
    pub fn new(
        mut vmm: Box<dyn Vmm>,
        decoder: Box<dyn Decoder>,
        pe: &PeHookData,
    ) -> EmuResult<Emulator> {
        let stack_base = vmm.alloc(pe.size_of_stack_reserve)?;
        let stack_top = stack_base.wrapping_add(pe.size_of_stack_reserve);

        let mut emu = Emulator {
            regs: RegisterFile::new(),
            eflags: EFlags::new(),
            eip: vmm.rva2va(pe.address_of_entry_point),
            vmm,
            decoder,
            cache: DecodedInstructionCache::new(),
            prefix_repe: false,
            prefix_repne: false,
        };
        emu.regs.set32(Reg::Esp, stack_top);
        emu.push32(MAPPING_END)?;
        Ok(emu)
    }

    /// the documented wire adapter: `{0: ok, -1: error, -2: program_exited}`
    pub fn step_code(&mut self) -> i32 {
        match self.step() {
            Ok(StepOutcome::Continue) => 0,
            Ok(StepOutcome::Exited) => -2,
            Err(_) => -1,
        }
    }

    pub fn step(&mut self) -> EmuResult<StepOutcome> {
        if self.eip == MAPPING_END {
            return Ok(StepOutcome::Exited);
        }

        if let Some(import) = self.vmm.get_import(self.eip) {
            ops::control::run_import_trap(self, &import)?;
            return Ok(StepOutcome::Continue);
        }

        let pc = self.eip;
        let instr = {
            let vmm = self.vmm.as_ref();
            let decoder = self.decoder.as_ref();
            self.cache.fetch(pc, vmm, decoder)?
        };
        if DEBUG_FETCH {
            println!("fetch {:#010x}: {:?} (len {})", pc, instr.opcode, instr.len);
        }

        if instr.opcode == Opcode::Invalid {
            return Err(EmuError::Decode(pc));
        }

        self.eip = pc.wrapping_add(instr.len);

        if DEBUG_DISPATCH {
            println!("dispatch {:#010x}: {}", pc, instr.opcode);
        }

        if let Opcode::RepPrefix(mode) = instr.opcode {
            match mode {
                RepMode::Repe => self.prefix_repe = true,
                RepMode::Repne => self.prefix_repne = true,
            }
            return Ok(StepOutcome::Continue);
        }
        if instr.opcode == Opcode::LockPrefix {
            return Ok(StepOutcome::Continue);
        }

        ops::dispatch(self, &instr)?;

        self.prefix_repe = false;
        self.prefix_repne = false;

        Ok(StepOutcome::Continue)
    }

    pub fn dbgstate(&self) -> String {
        format!(
            "eip={:#010x} eax={:#010x} ecx={:#010x} edx={:#010x} ebx={:#010x} \
             esp={:#010x} ebp={:#010x} esi={:#010x} edi={:#010x} eflags={:#010x} defined={:#010x}",
            self.eip,
            self.regs.get32(Reg::Eax),
            self.regs.get32(Reg::Ecx),
            self.regs.get32(Reg::Edx),
            self.regs.get32(Reg::Ebx),
            self.regs.get32(Reg::Esp),
            self.regs.get32(Reg::Ebp),
            self.regs.get32(Reg::Esi),
            self.regs.get32(Reg::Edi),
            self.eflags.bits,
            self.eflags.defined,
        )
    }

    // --- operand resolver ---

    pub(crate) fn calc_addr(&self, base: RegisterView, index: RegisterView, scale: u32, disp: i32) -> u32 {
        let base_val = self.regs.read_view(&base);
        let index_val = self.regs.read_view(&index);
        (disp as u32)
            .wrapping_add(base_val)
            .wrapping_add(scale.wrapping_mul(index_val))
    }

    pub(crate) fn read_operand(&self, op: &Operand) -> EmuResult<u32> {
        match *op {
            Operand::Register(view) => Ok(self.regs.read_view(&view)),
            Operand::Memory { base, index, scale, disp, size } => {
                let addr = self.calc_addr(base, index, scale, disp);
                self.read_sized(addr, size)
            }
            Operand::Immediate(v) => Ok(v as u32),
            Operand::Relative(v) => Ok(v as u32),
            Operand::None => Err(EmuError::OperandFault("read of an empty operand slot".into())),
        }
    }

    pub(crate) fn write_operand(&mut self, op: &Operand, val: u32) -> EmuResult<()> {
        match *op {
            Operand::Register(view) => {
                if view.is_sentinel() {
                    return Err(EmuError::OperandFault("write to sentinel register view".into()));
                }
                self.regs.write_view(&view, val);
                Ok(())
            }
            Operand::Memory { base, index, scale, disp, size } => {
                let addr = self.calc_addr(base, index, scale, disp);
                self.write_sized(addr, size, val)
            }
            Operand::Immediate(_) | Operand::Relative(_) => {
                Err(EmuError::OperandFault("write to an immediate/relative operand".into()))
            }
            Operand::None => Err(EmuError::OperandFault("write to an empty operand slot".into())),
        }
    }

    pub(crate) fn operand_width(&self, op: &Operand) -> Width {
        match *op {
            Operand::Register(view) => view.width(),
            Operand::Memory { size, .. } => size,
            _ => Width::Dword,
        }
    }

    pub(crate) fn read_sized(&self, addr: u32, size: Width) -> EmuResult<u32> {
        match size {
            Width::Byte => self.vmm.read8(addr).map(|v| v as u32),
            Width::Word => self.vmm.read16(addr).map(|v| v as u32),
            Width::Dword => self.vmm.read32(addr),
        }
    }

    pub(crate) fn write_sized(&mut self, addr: u32, size: Width, val: u32) -> EmuResult<()> {
        match size {
            Width::Byte => self.vmm.write8(addr, val as u8),
            Width::Word => self.vmm.write16(addr, val as u16),
            Width::Dword => self.vmm.write32(addr, val),
        }
    }

    // --- stack helpers ---

    pub(crate) fn push32(&mut self, val: u32) -> EmuResult<()> {
        let esp = self.regs.get32(Reg::Esp).wrapping_sub(4);
        self.regs.set32(Reg::Esp, esp);
        if DEBUG_STACK {
            println!("push32 {:#010x} -> esp={:#010x}", val, esp);
        }
        self.vmm.write32(esp, val).map_err(|_| EmuError::StackFault(format!("push at {:#010x}", esp)))
    }

    pub(crate) fn pop32(&mut self) -> EmuResult<u32> {
        let esp = self.regs.get32(Reg::Esp);
        let val = self.vmm.read32(esp).map_err(|_| EmuError::StackFault(format!("pop at {:#010x}", esp)))?;
        self.regs.set32(Reg::Esp, esp.wrapping_add(4));
        if DEBUG_STACK {
            println!("pop32 {:#010x} <- esp={:#010x}", val, esp);
        }
        Ok(val)
    }

    pub(crate) fn push16(&mut self, val: u16) -> EmuResult<()> {
        let esp = self.regs.get32(Reg::Esp).wrapping_sub(2);
        self.regs.set32(Reg::Esp, esp);
        self.vmm.write16(esp, val).map_err(|_| EmuError::StackFault(format!("push16 at {:#010x}", esp)))
    }

    pub(crate) fn pop16(&mut self) -> EmuResult<u16> {
        let esp = self.regs.get32(Reg::Esp);
        let val = self.vmm.read16(esp).map_err(|_| EmuError::StackFault(format!("pop16 at {:#010x}", esp)))?;
        self.regs.set32(Reg::Esp, esp.wrapping_add(2));
        Ok(val)
    }
}
