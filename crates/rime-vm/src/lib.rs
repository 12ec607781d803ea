//! rime-vm - the bytecode interpreter run over `rime-gc`'s heap.
//!
//! Instructions are genuine heap cons-cell lists, `(opcode-char arg1
//! arg2)` (`instr`), assembled by hand since this workspace carries no
//! compiler (`assemble`); the VM's value stack pins every live slot
//! individually rather than being itself a first-class heap object
//! (`stack`); native functions sit behind an opaque handle into a side
//! table rather than a function pointer in a slab cell (`primitive`);
//! and `vm` is the single dispatch loop that runs all of it, including
//! `call/cc` reification and re-entry.

mod assemble;
mod disasm;
mod env;
mod error;
mod instr;
mod logging;
mod opcode;
mod primitive;
mod stack;
mod vm;

pub use disasm::disassemble;
pub use error::{Result, VmError};
pub use opcode::Opcode;
pub use primitive::{PrimitiveFn, PrimitiveTable};
pub use stack::ValueStack;
pub use vm::{call, Vm};

pub use assemble::{cc_bytecode, fixnum, make_bytecode, make_instr};

/// Re-exported as a module too, for integration tests that read more
/// naturally as `assemble::make_instr(...)` than a flat import list.
pub use crate::assemble;
