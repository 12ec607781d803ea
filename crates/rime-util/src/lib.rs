//! rime-util - shared foundations for the rime runtime.
//!
//! Holds the two external collaborators the value model and the global
//! environment cannot type-check without (a symbol interner and a small
//! hashtable), plus the `bail!`/`ensure!` early-return macros the other
//! two crates use to keep error plumbing terse.
//!
//! Neither the interner nor the hashtable claim to be production-grade;
//! the surface reader, compiler, and primitive library that would actually
//! stress them are out of scope for this runtime core.

mod error;
mod hashtable;
mod symbol;

pub use hashtable::HashTable;
pub use symbol::{Symbol, SymbolTable};
