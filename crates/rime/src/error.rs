//! Top-level error type for the `rime` binary.
//!
//! `rime-gc` and `rime-vm` are libraries and never call
//! `std::process::exit`; this is the one place in the workspace where an
//! error becomes an exit code (§7.1).

use rime_gc::GcError;
use rime_vm::VmError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RimeError {
    #[error(transparent)]
    Gc(#[from] GcError),

    #[error(transparent)]
    Vm(#[from] VmError),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl RimeError {
    /// Mirrors `GcError::is_fatal`/`VmError::is_fatal`: every current
    /// variant here is fatal too, since `main` has nowhere further up
    /// to hand a recoverable error.
    pub fn is_fatal(&self) -> bool {
        match self {
            RimeError::Gc(e) => e.is_fatal(),
            RimeError::Vm(e) => e.is_fatal(),
            RimeError::Config(_) => true,
        }
    }

    /// Process exit code per the documented table: heap exhaustion is 1,
    /// any other GC error is 2, any VM error (including a GC error
    /// reached through `VmError::Gc`) is 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RimeError::Gc(GcError::HeapExhausted { .. }) => 1,
            RimeError::Gc(_) => 2,
            RimeError::Vm(_) => 1,
            RimeError::Config(_) => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, RimeError>;
