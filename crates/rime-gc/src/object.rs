//! The tagged-value heap's cell type.
//!
//! Every heap-allocated value is a `Cell` living at a stable index (a
//! `CellId`) in the arena `Heap` owns. Cells never move in memory once
//! allocated; relocation between the active and old lists is pure list
//! surgery over `prev`/`next` indices, not a memory copy. `ObjectRef` is
//! what the rest of the runtime actually passes around: booleans and the
//! empty list are atomic, identity-free values and so need no cell at
//! all, while every other variant — including numbers and characters,
//! which the original always boxed — is a `Cell`.

use rime_util::{HashTable, Symbol};
use std::fmt;

/// Index of a `Cell` in the arena. Stable for the cell's entire lifetime,
/// including across collections: a cell's index never changes, only its
/// list membership (`Active`/`Old`) and color do.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub(crate) u32);

impl fmt::Debug for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl CellId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A reference to a runtime value. Cheap to copy, the currency the VM and
/// GC pass around instead of raw cell addresses.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectRef {
    /// `()`, the empty list. Equal to itself and nothing else.
    Nil,
    /// `#t` / `#f`.
    Bool(bool),
    /// Everything else: pairs, numbers, characters, strings, symbols,
    /// vectors, procedures, primitives, hash tables.
    Cell(CellId),
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRef::Nil => write!(f, "()"),
            ObjectRef::Bool(b) => write!(f, "{b}"),
            ObjectRef::Cell(id) => write!(f, "{id:?}"),
        }
    }
}

impl ObjectRef {
    pub fn is_truthy(self) -> bool {
        !matches!(self, ObjectRef::Bool(false))
    }

    pub fn as_cell(self) -> Option<CellId> {
        match self {
            ObjectRef::Cell(id) => Some(id),
            _ => None,
        }
    }
}

/// The payload of a `Cell`: exactly one of the value variants the runtime
/// knows about. `PAIR`, the three procedure shapes, `COMPILED_PROC` and
/// `COMPILED_SYNTAX_PROC` hold `ObjectRef` fields the collector must
/// trace; `FIXNUM`/`CHARACTER`/`SYMBOL`/`PRIMITIVE_PROC` hold none;
/// `STRING`/`VECTOR`/`HASH_TABLE` own out-of-slab Rust collections that
/// finalization drops by overwriting the payload.
pub enum Payload {
    Pair {
        car: ObjectRef,
        cdr: ObjectRef,
    },
    Fixnum(i64),
    Character(u8),
    /// Out-of-slab mutable byte buffer. Finalizable.
    Str(Vec<u8>),
    Symbol(Symbol),
    /// Out-of-slab array of object references. Finalizable.
    Vector(Vec<ObjectRef>),
    CompoundProc {
        params: ObjectRef,
        body: ObjectRef,
        env: ObjectRef,
    },
    SyntaxProc {
        params: ObjectRef,
        body: ObjectRef,
        env: ObjectRef,
    },
    CompiledProc {
        bytecode: ObjectRef,
        env: ObjectRef,
    },
    CompiledSyntaxProc {
        bytecode: ObjectRef,
        env: ObjectRef,
    },
    MetaProc {
        proc: ObjectRef,
        meta: ObjectRef,
    },
    /// Opaque handle into the VM's primitive table. The collector never
    /// needs to look inside; it carries no object references.
    PrimitiveProc(u32),
    /// Out-of-slab hash table. Finalizable.
    HashTable(HashTable<ObjectRef, ObjectRef>),
    /// A payload left behind by `finalize_object`, once the out-of-slab
    /// resource a `Str`/`Vector`/`HashTable` cell owned has been dropped.
    /// A freed cell is always in this state until `alloc` reuses it.
    Tombstone,
}

impl Payload {
    /// Whether this payload owns an out-of-slab resource that needs
    /// dropping before the cell can be safely reused.
    pub fn needs_finalization(&self) -> bool {
        matches!(
            self,
            Payload::Str(_) | Payload::Vector(_) | Payload::HashTable(_)
        )
    }

    /// Visit every `ObjectRef` this payload holds directly. Used by the
    /// collector's mark phase; see the module doc on `Cell` for why
    /// `PrimitiveProc` and the atomic variants contribute nothing.
    pub fn for_each_child(&self, mut visit: impl FnMut(ObjectRef)) {
        match self {
            Payload::Pair { car, cdr } => {
                visit(*car);
                visit(*cdr);
            }
            Payload::Vector(items) => {
                for item in items {
                    visit(*item);
                }
            }
            Payload::CompoundProc { params, body, env } | Payload::SyntaxProc { params, body, env } => {
                visit(*params);
                visit(*body);
                visit(*env);
            }
            Payload::CompiledProc { bytecode, env } | Payload::CompiledSyntaxProc { bytecode, env } => {
                visit(*bytecode);
                visit(*env);
            }
            Payload::MetaProc { proc, meta } => {
                visit(*proc);
                visit(*meta);
            }
            Payload::HashTable(table) => {
                for (k, v) in table.iter() {
                    visit(*k);
                    visit(*v);
                }
            }
            Payload::Fixnum(_)
            | Payload::Character(_)
            | Payload::Str(_)
            | Payload::Symbol(_)
            | Payload::PrimitiveProc(_)
            | Payload::Tombstone => {}
        }
    }
}

/// One slot in the heap arena.
pub struct Cell {
    pub(crate) color: u8,
    pub(crate) prev: Option<CellId>,
    pub(crate) next: Option<CellId>,
    pub payload: Payload,
}
