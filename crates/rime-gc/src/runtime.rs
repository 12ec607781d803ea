//! The `Runtime`: the heap, roots, finalizer stacks, collector epoch,
//! symbol table, and global environment bound together into one value.
//! Every other crate in the workspace takes `&mut Runtime` rather than
//! reaching for global statics the way the original's `Active_Heap_Objects`
//! /`Root_Objects`/`current_color` C globals do — see the crate's module
//! doc for why a single-process, single-instance runtime still isn't
//! `Sync`.

use rime_util::{HashTable, Symbol, SymbolTable};

use crate::config::GcConfig;
use crate::error::{GcError, Result};
use crate::finalize::FinalizerStacks;
use crate::gc::Collector;
use crate::heap::Heap;
use crate::object::{Cell, CellId, ObjectRef, Payload};
use crate::roots::{RootGuard, RootStack};

/// Marker making `Runtime` unconditionally `!Sync`. The heap, roots, and
/// collector epoch are mutated through plain `&mut self` with no
/// internal locking; sharing a `&Runtime` across threads (even without
/// mutation, since `Sync` implies other threads could also be holding
/// `&Runtime` while one calls a `&mut self` method through interior
/// mutability added later) is exactly the bug class §5 rules out.
struct NotSync(std::marker::PhantomData<std::cell::Cell<()>>);

pub struct Runtime {
    heap: Heap,
    roots: RootStack,
    finalizer: FinalizerStacks,
    collector: Collector,
    config: GcConfig,
    symbols: SymbolTable,
    globals: HashTable<Symbol, ObjectRef>,
    _not_sync: NotSync,
}

impl Runtime {
    pub fn new(config: GcConfig) -> Result<Self> {
        config.validate()?;
        let mut heap = Heap::new();
        let collector = Collector::new(&config);
        heap.extend(config.initial_heap_cells, collector.color);
        Ok(Runtime {
            heap,
            roots: RootStack::with_capacity(config.root_stack_initial_capacity),
            finalizer: FinalizerStacks::with_capacity(config.finalizable_initial_capacity),
            collector,
            config,
            symbols: SymbolTable::new(),
            globals: HashTable::new(),
            _not_sync: NotSync(std::marker::PhantomData),
        })
    }

    // ---- roots -----------------------------------------------------

    pub fn pin(&mut self, value: ObjectRef) -> RootGuard {
        self.roots.pin(value)
    }

    pub fn root(&self, guard: RootGuard) -> ObjectRef {
        self.roots
            .get(guard)
            .expect("root guard used after being unpinned, or from a different runtime")
    }

    pub fn reroot(&mut self, guard: RootGuard, value: ObjectRef) {
        if !self.roots.set(guard, value) {
            panic!("root guard used after being unpinned, or from a different runtime");
        }
    }

    pub fn unpin(&mut self, guard: RootGuard) -> Result<()> {
        if self.roots.unpin(guard) {
            Ok(())
        } else {
            Err(GcError::UnknownRoot(guard))
        }
    }

    // ---- allocation --------------------------------------------------

    /// Every object the collector must not reclaim: the pinned root
    /// stack plus every value currently bound in the global environment.
    /// A binding with no other referent is still live as long as some
    /// code could still `gvar` it back out. A free function, not a
    /// `&self` method, so callers can borrow `roots`/`globals` alongside
    /// a disjoint `&mut self.heap` in the same call.
    fn trace_roots<'a>(
        roots: &'a RootStack,
        globals: &'a HashTable<Symbol, ObjectRef>,
    ) -> impl Iterator<Item = ObjectRef> + 'a {
        roots.iter().chain(globals.values().copied())
    }

    fn alloc(&mut self, payload: Payload) -> Result<CellId> {
        let needs_finalization = payload.needs_finalization();
        self.collector.ensure_free_cell(
            &mut self.heap,
            Self::trace_roots(&self.roots, &self.globals),
            &mut self.finalizer,
            &self.config,
        )?;
        let id = self
            .heap
            .take_free()
            .expect("ensure_free_cell guarantees a free cell is available");
        self.heap.cell_mut(id).color = self.collector.color;
        self.heap.cell_mut(id).payload = payload;
        if needs_finalization {
            self.finalizer.register(id);
        }
        Ok(id)
    }

    pub fn alloc_pair(&mut self, car: ObjectRef, cdr: ObjectRef) -> Result<ObjectRef> {
        self.alloc(Payload::Pair { car, cdr }).map(ObjectRef::Cell)
    }

    pub fn alloc_fixnum(&mut self, value: i64) -> Result<ObjectRef> {
        self.alloc(Payload::Fixnum(value)).map(ObjectRef::Cell)
    }

    pub fn alloc_character(&mut self, value: u8) -> Result<ObjectRef> {
        self.alloc(Payload::Character(value)).map(ObjectRef::Cell)
    }

    pub fn alloc_string(&mut self, bytes: Vec<u8>) -> Result<ObjectRef> {
        self.alloc(Payload::Str(bytes)).map(ObjectRef::Cell)
    }

    pub fn alloc_symbol(&mut self, name: &str) -> Result<ObjectRef> {
        let symbol = self.symbols.intern(name);
        self.alloc(Payload::Symbol(symbol)).map(ObjectRef::Cell)
    }

    pub fn alloc_vector(&mut self, len: usize, fill: ObjectRef) -> Result<ObjectRef> {
        self.alloc(Payload::Vector(vec![fill; len])).map(ObjectRef::Cell)
    }

    pub fn alloc_compound_proc(
        &mut self,
        params: ObjectRef,
        body: ObjectRef,
        env: ObjectRef,
    ) -> Result<ObjectRef> {
        self.alloc(Payload::CompoundProc { params, body, env })
            .map(ObjectRef::Cell)
    }

    pub fn alloc_syntax_proc(
        &mut self,
        params: ObjectRef,
        body: ObjectRef,
        env: ObjectRef,
    ) -> Result<ObjectRef> {
        self.alloc(Payload::SyntaxProc { params, body, env })
            .map(ObjectRef::Cell)
    }

    pub fn alloc_compiled_proc(&mut self, bytecode: ObjectRef, env: ObjectRef) -> Result<ObjectRef> {
        self.alloc(Payload::CompiledProc { bytecode, env })
            .map(ObjectRef::Cell)
    }

    pub fn alloc_compiled_syntax_proc(
        &mut self,
        bytecode: ObjectRef,
        env: ObjectRef,
    ) -> Result<ObjectRef> {
        self.alloc(Payload::CompiledSyntaxProc { bytecode, env })
            .map(ObjectRef::Cell)
    }

    pub fn alloc_meta_proc(&mut self, proc: ObjectRef, meta: ObjectRef) -> Result<ObjectRef> {
        self.alloc(Payload::MetaProc { proc, meta }).map(ObjectRef::Cell)
    }

    pub fn alloc_primitive_proc(&mut self, id: u32) -> Result<ObjectRef> {
        self.alloc(Payload::PrimitiveProc(id)).map(ObjectRef::Cell)
    }

    pub fn alloc_hash_table(&mut self) -> Result<ObjectRef> {
        self.alloc(Payload::HashTable(HashTable::new())).map(ObjectRef::Cell)
    }

    // ---- accessors -----------------------------------------------------

    fn cell(&self, obj: ObjectRef) -> Result<&Cell> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "cell", found: obj })?;
        Ok(self.heap.cell(id))
    }

    pub fn car(&self, obj: ObjectRef) -> Result<ObjectRef> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "pair", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::Pair { car, .. } => Ok(*car),
            _ => Err(GcError::NotAPair(id)),
        }
    }

    pub fn cdr(&self, obj: ObjectRef) -> Result<ObjectRef> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "pair", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::Pair { cdr, .. } => Ok(*cdr),
            _ => Err(GcError::NotAPair(id)),
        }
    }

    pub fn set_car(&mut self, obj: ObjectRef, value: ObjectRef) -> Result<()> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "pair", found: obj })?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::Pair { car, .. } => {
                *car = value;
                Ok(())
            }
            _ => Err(GcError::NotAPair(id)),
        }
    }

    pub fn set_cdr(&mut self, obj: ObjectRef, value: ObjectRef) -> Result<()> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "pair", found: obj })?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::Pair { cdr, .. } => {
                *cdr = value;
                Ok(())
            }
            _ => Err(GcError::NotAPair(id)),
        }
    }

    pub fn fixnum_value(&self, obj: ObjectRef) -> Option<i64> {
        match self.cell(obj).ok()?.payload {
            Payload::Fixnum(v) => Some(v),
            _ => None,
        }
    }

    pub fn character_value(&self, obj: ObjectRef) -> Option<u8> {
        match self.cell(obj).ok()?.payload {
            Payload::Character(c) => Some(c),
            _ => None,
        }
    }

    pub fn symbol_value(&self, obj: ObjectRef) -> Option<Symbol> {
        match self.cell(obj).ok()?.payload {
            Payload::Symbol(s) => Some(s),
            _ => None,
        }
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        self.symbols.resolve(symbol)
    }

    pub fn intern(&mut self, name: &str) -> Symbol {
        self.symbols.intern(name)
    }

    fn vector_cell(&self, obj: ObjectRef) -> Result<CellId> {
        obj.as_cell().ok_or(GcError::NotACell { expected: "vector", found: obj })
    }

    pub fn vector_len(&self, obj: ObjectRef) -> Result<usize> {
        let id = self.vector_cell(obj)?;
        match &self.heap.cell(id).payload {
            Payload::Vector(items) => Ok(items.len()),
            _ => Err(GcError::NotAVector(id)),
        }
    }

    pub fn vector_get(&self, obj: ObjectRef, index: usize) -> Result<ObjectRef> {
        let id = self.vector_cell(obj)?;
        match &self.heap.cell(id).payload {
            Payload::Vector(items) => items
                .get(index)
                .copied()
                .ok_or(GcError::VectorIndexOutOfBounds { index, len: items.len() }),
            _ => Err(GcError::NotAVector(id)),
        }
    }

    pub fn vector_set(&mut self, obj: ObjectRef, index: usize, value: ObjectRef) -> Result<()> {
        let id = self.vector_cell(obj)?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::Vector(items) => {
                let len = items.len();
                let slot = items.get_mut(index).ok_or(GcError::VectorIndexOutOfBounds { index, len })?;
                *slot = value;
                Ok(())
            }
            _ => Err(GcError::NotAVector(id)),
        }
    }

    /// Grow a vector in place by appending `additional` copies of
    /// `fill`. Used by the VM's `args`/`argsdot` handling when a call
    /// supplies more arguments than the frame vector was sized for.
    pub fn vector_grow(&mut self, obj: ObjectRef, additional: usize, fill: ObjectRef) -> Result<()> {
        let id = self.vector_cell(obj)?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::Vector(items) => {
                items.extend(std::iter::repeat(fill).take(additional));
                Ok(())
            }
            _ => Err(GcError::NotAVector(id)),
        }
    }

    /// Fields of a `COMPOUND_PROC`/`SYNTAX_PROC` cell: `(params, body, env)`.
    pub fn compound_proc_fields(&self, obj: ObjectRef) -> Result<(ObjectRef, ObjectRef, ObjectRef)> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "procedure", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::CompoundProc { params, body, env } | Payload::SyntaxProc { params, body, env } => {
                Ok((*params, *body, *env))
            }
            _ => Err(GcError::NotAProcedure(id)),
        }
    }

    /// Fields of a `COMPILED_PROC`/`COMPILED_SYNTAX_PROC` cell: `(bytecode, env)`.
    pub fn compiled_proc_fields(&self, obj: ObjectRef) -> Result<(ObjectRef, ObjectRef)> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "compiled procedure", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::CompiledProc { bytecode, env } | Payload::CompiledSyntaxProc { bytecode, env } => {
                Ok((*bytecode, *env))
            }
            _ => Err(GcError::NotAProcedure(id)),
        }
    }

    /// Fields of a `META_PROC` cell: `(proc, meta)`.
    pub fn meta_proc_fields(&self, obj: ObjectRef) -> Result<(ObjectRef, ObjectRef)> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "meta procedure", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::MetaProc { proc, meta } => Ok((*proc, *meta)),
            _ => Err(GcError::NotAProcedure(id)),
        }
    }

    pub fn primitive_proc_id(&self, obj: ObjectRef) -> Result<u32> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "primitive procedure", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::PrimitiveProc(handle) => Ok(*handle),
            _ => Err(GcError::NotAProcedure(id)),
        }
    }

    pub fn string_bytes(&self, obj: ObjectRef) -> Result<&[u8]> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "string", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::Str(bytes) => Ok(bytes),
            _ => Err(GcError::NotAString(id)),
        }
    }

    pub fn string_set_bytes(&mut self, obj: ObjectRef, bytes: Vec<u8>) -> Result<()> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "string", found: obj })?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::Str(slot) => {
                *slot = bytes;
                Ok(())
            }
            _ => Err(GcError::NotAString(id)),
        }
    }

    pub fn hash_table_get(&self, obj: ObjectRef, key: ObjectRef) -> Result<Option<ObjectRef>> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "hash table", found: obj })?;
        match &self.heap.cell(id).payload {
            Payload::HashTable(table) => Ok(table.get(&key).copied()),
            _ => Err(GcError::NotAHashTable(id)),
        }
    }

    pub fn hash_table_insert(&mut self, obj: ObjectRef, key: ObjectRef, value: ObjectRef) -> Result<()> {
        let id = obj
            .as_cell()
            .ok_or(GcError::NotACell { expected: "hash table", found: obj })?;
        match &mut self.heap.cell_mut(id).payload {
            Payload::HashTable(table) => {
                table.insert(key, value);
                Ok(())
            }
            _ => Err(GcError::NotAHashTable(id)),
        }
    }

    pub fn define_global(&mut self, symbol: Symbol, value: ObjectRef) {
        self.globals.insert(symbol, value);
    }

    pub fn lookup_global(&self, symbol: Symbol) -> Option<ObjectRef> {
        self.globals.get(&symbol).copied()
    }

    /// Run a collection cycle immediately, bypassing the
    /// collect-then-extend heuristic. Exposed for tests and for a `(gc)`
    /// primitive; normal allocation never needs to call this directly.
    pub fn collect_now(&mut self) -> usize {
        let roots = Self::trace_roots(&self.roots, &self.globals);
        self.collector.collect(&mut self.heap, roots, &mut self.finalizer)
    }

    pub fn live_count(&self) -> usize {
        self.heap.live_count()
    }

    pub fn free_count(&self) -> usize {
        self.heap.free_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocating_a_pair_reads_back_its_fields() {
        let mut rt = Runtime::new(GcConfig::default()).unwrap();
        let car = rt.alloc_fixnum(1).unwrap();
        let cdr = rt.alloc_fixnum(2).unwrap();
        let pair = rt.alloc_pair(car, cdr).unwrap();
        assert_eq!(rt.fixnum_value(rt.car(pair).unwrap()), Some(1));
        assert_eq!(rt.fixnum_value(rt.cdr(pair).unwrap()), Some(2));
    }

    #[test]
    fn pinned_pair_survives_allocation_pressure() {
        let cfg = GcConfig {
            initial_heap_cells: 8,
            heap_extension_growth: 2,
            extension_trigger_ratio: 1,
            ..GcConfig::default()
        };
        let mut rt = Runtime::new(cfg).unwrap();
        let kept = rt.alloc_fixnum(99).unwrap();
        let guard = rt.pin(kept);

        for i in 0..500 {
            rt.alloc_fixnum(i).unwrap();
        }

        let kept = rt.root(guard);
        assert_eq!(rt.fixnum_value(kept), Some(99));
        rt.unpin(guard).unwrap();
    }

    #[test]
    fn unrooted_pairs_get_reclaimed() {
        let cfg = GcConfig {
            initial_heap_cells: 4,
            heap_extension_growth: 2,
            extension_trigger_ratio: 1,
            ..GcConfig::default()
        };
        let mut rt = Runtime::new(cfg).unwrap();
        for i in 0..4 {
            rt.alloc_fixnum(i).unwrap();
        }
        let live_before_extend = rt.live_count();
        rt.collect_now();
        // nothing was rooted, so the whole initial block should be free again
        assert_eq!(rt.free_count(), live_before_extend);
    }

    #[test]
    fn global_environment_roundtrips() {
        let mut rt = Runtime::new(GcConfig::default()).unwrap();
        let sym = rt.intern("x");
        let value = rt.alloc_fixnum(7).unwrap();
        rt.define_global(sym, value);
        assert_eq!(rt.fixnum_value(rt.lookup_global(sym).unwrap()), Some(7));
    }
}
