//! Error taxonomy for the heap and collector.
//!
//! Mirrors the split `fgc::FgcError` draws between recoverable conditions
//! and bugs: everything here is either something a caller can reasonably
//! react to (heap pressure) or a contract violation (double free, unknown
//! root, forged handle) that should fail loudly rather than silently
//! corrupt the heap.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GcError {
    #[error("heap exhausted: {live} cells live, extension to {attempted} cells rejected")]
    HeapExhausted { live: usize, attempted: usize },

    #[error("expected a {expected} cell, got an atomic value ({found:?})")]
    NotACell {
        expected: &'static str,
        found: crate::object::ObjectRef,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("root guard {0:?} was never pinned, or was already unpinned")]
    UnknownRoot(crate::roots::RootGuard),

    #[error("cell {0:?} does not hold a pair")]
    NotAPair(crate::object::CellId),

    #[error("cell {0:?} does not hold a vector")]
    NotAVector(crate::object::CellId),

    #[error("vector index {index} out of bounds for length {len}")]
    VectorIndexOutOfBounds { index: usize, len: usize },

    #[error("cell {0:?} does not hold a string")]
    NotAString(crate::object::CellId),

    #[error("cell {0:?} does not hold a hash table")]
    NotAHashTable(crate::object::CellId),

    #[error("cell {0:?} does not hold a procedure")]
    NotAProcedure(crate::object::CellId),
}

impl GcError {
    /// Whether this error reflects a caller bug (forged handle, stale
    /// cell id, type confusion) as opposed to ordinary resource pressure.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, GcError::HeapExhausted { .. })
    }
}

pub type Result<T> = std::result::Result<T, GcError>;
