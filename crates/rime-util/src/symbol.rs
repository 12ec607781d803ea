//! Symbol interning.
//!
//! A `Symbol` is a 4-byte handle into a `SymbolTable`, the interface the
//! value model's `SYMBOL` variant and the global environment are built on.
//! The runtime is single-threaded, so unlike a compiler's interner this
//! one carries no locking or atomics — it is a plain `HashMap` guarded
//! by ordinary borrowing.

use rustc_hash::FxHashMap;
use std::fmt;

/// An interned name. Two symbols compare equal iff they were interned from
/// equal strings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol(u32);

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.0)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the string storage for every `Symbol` handed out.
///
/// Strings are never removed once interned: the set of distinct symbols a
/// running program touches is small and bounded by source text, so there is
/// nothing to reclaim and no reference counting is worth the complexity.
#[derive(Default)]
pub struct SymbolTable {
    ids: FxHashMap<Box<str>, u32>,
    names: Vec<Box<str>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `name`, returning the same `Symbol` for every equal string.
    pub fn intern(&mut self, name: &str) -> Symbol {
        if let Some(&id) = self.ids.get(name) {
            return Symbol(id);
        }
        let id = self.names.len() as u32;
        let boxed: Box<str> = name.into();
        self.names.push(boxed.clone());
        self.ids.insert(boxed, id);
        Symbol(id)
    }

    /// Look up the text behind a symbol. Panics on a symbol from a
    /// different table — callers only ever hold symbols their own table
    /// produced, the same way an arena handle can't outlive its arena.
    pub fn resolve(&self, symbol: Symbol) -> &str {
        &self.names[symbol.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_string_yields_same_symbol() {
        let mut table = SymbolTable::new();
        let a = table.intern("lambda");
        let b = table.intern("lambda");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        let mut table = SymbolTable::new();
        let a = table.intern("car");
        let b = table.intern("cdr");
        assert_ne!(a, b);
    }

    #[test]
    fn resolve_roundtrips() {
        let mut table = SymbolTable::new();
        let sym = table.intern("call/cc");
        assert_eq!(table.resolve(sym), "call/cc");
    }

    #[test]
    fn len_counts_distinct_symbols() {
        let mut table = SymbolTable::new();
        table.intern("a");
        table.intern("b");
        table.intern("a");
        assert_eq!(table.len(), 2);
    }
}
