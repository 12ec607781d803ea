//! rime-gc - the tagged-value heap and its tracing collector.
//!
//! The heap is a slab of cells (`Heap`) threaded into two doubly-linked
//! lists, `active` and `old`; a collection cycle relocates reachable
//! cells from `active` to `old` by list surgery, never by copying or
//! moving memory, so a `CellId` stays valid for a cell's entire
//! lifetime. This is a deliberate rearchitecture of the original's
//! pointer-linked lists into index-linked ones: nothing here takes the
//! address of a cell, so there is nothing for a moving collector to
//! invalidate, and the arena can be a plain growable `Vec`.
//!
//! `Runtime` is the single owner of the heap, the root stack, the
//! finalizer stacks, the collector's color epoch, the symbol table, and
//! the global environment. It is deliberately not `Sync`: nothing in
//! this crate takes a lock, so two threads sharing a `Runtime` would be
//! racing on every field.

mod config;
mod error;
mod finalize;
mod gc;
mod heap;
mod logging;
mod object;
mod roots;
mod runtime;

pub use config::GcConfig;
pub use error::{GcError, Result};
pub use logging::GcEvent;
pub use object::{CellId, ObjectRef, Payload};
pub use roots::RootGuard;
pub use runtime::Runtime;

pub use rime_util::Symbol;
