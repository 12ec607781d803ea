//! `VmError`: everything that can go wrong dispatching bytecode. None of
//! these are recoverable inside the core today (§7 of the design docs) —
//! `is_fatal()` exists so a host embedding this crate has a documented
//! place to hook in recovery later without changing the enum's shape.

use rime_gc::GcError;
use rime_util::Symbol;

pub type Result<T> = std::result::Result<T, VmError>;

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("pc flew off the end of the bytecode vector (pc={pc}, len={len})")]
    PcOutOfBounds { pc: usize, len: usize },

    #[error("strange opcode byte {0}")]
    UnknownOpcode(u8),

    #[error("don't know how to invoke this object")]
    NotCallable,

    #[error("malformed instruction operand: {0}")]
    BadOperand(&'static str),

    #[error("wrong number of args: expected {expected}, got {got}")]
    ArgCountMismatch { expected: i64, got: i64 },

    #[error("object is not a compiled procedure")]
    NotCompiledProcedure,

    #[error("reference to unbound variable {0:?}")]
    UnboundVariable(Symbol),

    #[error("value stack underflow")]
    StackUnderflow,

    #[error("unknown primitive handle {0}")]
    UnknownPrimitive(u32),

    #[error(transparent)]
    Gc(#[from] GcError),
}

impl VmError {
    /// Mirrors `GcError::is_fatal`. Every current variant is fatal; the
    /// predicate is here so a caller can write one dispatch regardless of
    /// whether the underlying failure came from the VM or the GC.
    pub fn is_fatal(&self) -> bool {
        match self {
            VmError::Gc(e) => e.is_fatal(),
            _ => true,
        }
    }
}
