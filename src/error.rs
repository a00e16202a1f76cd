//! Error kinds produced by the emulation core.
//!
//! One `quick_error!` enum with a `Display` impl, no hand-written
//! `std::error::Error` boilerplate.

quick_error! {
    #[derive(Debug, PartialEq, Clone)]
    pub enum EmuError {
        /// fetch could not read or decode an instruction at `pc`
        Decode(pc: u32) {
            display("decode failure at {:#010x}", pc)
        }
        /// a VMM read/write failed, or a destination register view was the sentinel
        OperandFault(detail: String) {
            display("operand fault: {}", detail)
        }
        /// a push/pop (or other stack-relative access) faulted in the VMM
        StackFault(detail: String) {
            display("stack fault: {}", detail)
        }
        /// the dispatcher has no handler for the decoded opcode
        Unimplemented(opcode: String) {
            display("unimplemented opcode: {}", opcode)
        }
        /// an import trap declared a shape this core does not support (varargs)
        UnsupportedImport(detail: String) {
            display("unsupported import: {}", detail)
        }
    }
}

pub type EmuResult<T> = Result<T, EmuError>;
