//! Primitive procedures: native functions invoked through the same
//! `callj`/`fcallj` dispatch as compiled closures (§4.4.5).
//!
//! A `PRIMITIVE_PROC` cell's payload is an opaque `u32` (`rime_gc`'s
//! `Payload::PrimitiveProc`) rather than a function pointer, since a slab
//! cell can't own a `Box<dyn Fn>` without changing every payload's size.
//! The VM instead keeps the actual closures in a side table here and
//! treats the slab payload as a handle into it — the handle-table
//! pattern `rime-gc`'s own `HASH_TABLE`/`bytecode` handling already uses
//! for out-of-slab resources.

use std::rc::Rc;

use rime_gc::{ObjectRef, Runtime};

use crate::error::{Result, VmError};
use crate::stack::ValueStack;

pub type PrimitiveFn = dyn Fn(&ValueStack, usize, usize, &mut Runtime) -> Result<ObjectRef>;

#[derive(Default)]
pub struct PrimitiveTable {
    fns: Vec<Rc<PrimitiveFn>>,
}

impl PrimitiveTable {
    pub fn new() -> Self {
        PrimitiveTable { fns: Vec::new() }
    }

    /// Register a native function, returning the handle to embed in a
    /// `PRIMITIVE_PROC` cell via `Runtime::alloc_primitive_proc`.
    pub fn register(&mut self, f: impl Fn(&ValueStack, usize, usize, &mut Runtime) -> Result<ObjectRef> + 'static) -> u32 {
        let id = self.fns.len() as u32;
        self.fns.push(Rc::new(f));
        id
    }

    /// Call the primitive living at `handle` with the given argument
    /// window. `stack_top` is the absolute stack length at call time, so
    /// the callee can compute `stack_top - n_args ..` itself.
    pub fn call(
        &self,
        handle: u32,
        stack: &ValueStack,
        n_args: usize,
        stack_top: usize,
        rt: &mut Runtime,
    ) -> Result<ObjectRef> {
        let f = self
            .fns
            .get(handle as usize)
            .cloned()
            .ok_or(VmError::UnknownPrimitive(handle))?;
        f(stack, n_args, stack_top, rt)
    }
}
