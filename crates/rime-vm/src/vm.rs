//! The bytecode interpreter: one flat dispatch loop standing in for the
//! original's `vm()`/`vm_execute()` pair. Every opcode in `Opcode` is
//! handled here; none of it recurses back into Rust to make a Scheme
//! call — `callj`/`fcallj` just rewrite `pc`/`fn_code`/`env` in place and
//! the `loop` keeps going, which is what lets an arbitrarily deep chain
//! of Scheme-level tail calls run in O(1) native stack depth. The only
//! thing that ever leaves this loop early is a primitive call (a single
//! native function call, never itself re-entering the VM) or the final
//! `Return`/`Fcallj`/`Callj` return-sequence that unwinds all the way
//! back to this call's own entry depth.

use rime_gc::{ObjectRef, RootGuard, Runtime};

use crate::assemble;
use crate::env;
use crate::error::{Result, VmError};
use crate::instr;
use crate::logging::{emit, VmEvent};
use crate::opcode::Opcode;
use crate::primitive::PrimitiveTable;
use crate::stack::ValueStack;

pub struct Vm {
    stack: ValueStack,
    primitives: PrimitiveTable,
    cc_bytecode: ObjectRef,
    cc_bytecode_guard: RootGuard,
}

/// What happened after trying to enter a callable: a compiled procedure
/// starts executing its own bytecode at the returned `pc` (always 0
/// today; kept explicit since that's what the return-sequence case
/// produces too), or a primitive ran to completion and left its result
/// on the stack for the caller to thread through a return-sequence.
enum Entered {
    Jump { bytecode: ObjectRef, pc: usize },
    RanPrimitive,
}

enum ReturnOutcome {
    Done(ObjectRef),
    Resume { pc: usize },
}

impl Vm {
    pub fn new(rt: &mut Runtime) -> Result<Self> {
        let cc_bytecode = assemble::cc_bytecode(rt)?;
        let cc_bytecode_guard = rt.pin(cc_bytecode);
        Ok(Vm {
            stack: ValueStack::new(),
            primitives: PrimitiveTable::new(),
            cc_bytecode,
            cc_bytecode_guard,
        })
    }

    pub fn primitives_mut(&mut self) -> &mut PrimitiveTable {
        &mut self.primitives
    }

    /// Push a value onto the argument window a following `execute` call
    /// will consume. Callers build up `n_args` values this way, then call
    /// `execute` with the same count.
    pub fn push_arg(&mut self, rt: &mut Runtime, value: ObjectRef) {
        self.stack.push(rt, value);
    }

    /// Run `callee` (a compiled procedure or a primitive) against the
    /// `n_args` values most recently pushed via `push_arg`, returning its
    /// result. `callee` may itself be a `MetaProc`-wrapped value; it is
    /// unwrapped exactly once, matching `callj`/`fcallj`.
    pub fn execute(&mut self, rt: &mut Runtime, callee: ObjectRef, n_args: usize) -> Result<ObjectRef> {
        let initial_top = self
            .stack
            .len()
            .checked_sub(n_args)
            .ok_or(VmError::StackUnderflow)?;

        let fn_guard = rt.pin(ObjectRef::Nil);
        let env_guard = rt.pin(ObjectRef::Nil);
        let result = self.run(rt, callee, n_args as i64, initial_top, fn_guard, env_guard);
        rt.unpin(env_guard)?;
        rt.unpin(fn_guard)?;
        result
    }

    fn run(
        &mut self,
        rt: &mut Runtime,
        callee: ObjectRef,
        n_args: i64,
        initial_top: usize,
        fn_guard: RootGuard,
        env_guard: RootGuard,
    ) -> Result<ObjectRef> {
        let mut current_n_args = n_args;
        let (mut fn_code, mut pc) = match self.enter_call(rt, callee, n_args, false, fn_guard, env_guard)? {
            Entered::Jump { bytecode, pc } => (bytecode, pc),
            Entered::RanPrimitive => {
                return match self.finish_return(rt, initial_top, fn_guard, env_guard)? {
                    ReturnOutcome::Done(v) => Ok(v),
                    ReturnOutcome::Resume { .. } => {
                        unreachable!("a call at a fresh execute() entry always returns at its own depth")
                    }
                };
            }
        };

        loop {
            let len = rt.vector_len(fn_code)?;
            if pc >= len {
                return Err(VmError::PcOutOfBounds { pc, len });
            }
            let instr_cell = rt.vector_get(fn_code, pc)?;
            pc += 1;
            let op = instr::opcode(rt, instr_cell)?;

            match op {
                Opcode::Args => self.bind_fixed_args(rt, instr_cell, env_guard, current_n_args)?,
                Opcode::ArgsDot => self.bind_rest_args(rt, instr_cell, env_guard, current_n_args)?,

                Opcode::Const => {
                    let v = instr::arg1(rt, instr_cell)?;
                    self.stack.push(rt, v);
                }

                Opcode::Fn => {
                    let body = instr::arg1(rt, instr_cell)?;
                    let env_val = rt.root(env_guard);
                    let closure = rt.alloc_compiled_proc(body, env_val)?;
                    self.stack.push(rt, closure);
                }

                Opcode::Fjump => {
                    let target = instr::arg_fixnum(rt, instr_cell, false)? as usize;
                    let v = self.stack.pop(rt)?;
                    if !v.is_truthy() {
                        pc = target;
                    }
                }

                Opcode::Tjump => {
                    let target = instr::arg_fixnum(rt, instr_cell, false)? as usize;
                    let v = self.stack.pop(rt)?;
                    if v.is_truthy() {
                        pc = target;
                    }
                }

                Opcode::Jump => {
                    pc = instr::arg_fixnum(rt, instr_cell, false)? as usize;
                }

                Opcode::Gvar => {
                    let sym_obj = instr::arg1(rt, instr_cell)?;
                    let sym = rt
                        .symbol_value(sym_obj)
                        .ok_or(VmError::BadOperand("gvar operand is not a symbol"))?;
                    let v = rt.lookup_global(sym).ok_or(VmError::UnboundVariable(sym))?;
                    self.stack.push(rt, v);
                }

                Opcode::Gset => {
                    let sym_obj = instr::arg1(rt, instr_cell)?;
                    let sym = rt
                        .symbol_value(sym_obj)
                        .ok_or(VmError::BadOperand("gset operand is not a symbol"))?;
                    let v = self.stack.top(rt)?;
                    rt.define_global(sym, v);
                }

                Opcode::Lvar => {
                    let depth = instr::arg_fixnum(rt, instr_cell, false)?;
                    let index = instr::arg_fixnum(rt, instr_cell, true)?;
                    let env_val = rt.root(env_guard);
                    let frame = env::frame_at(rt, env_val, depth)?;
                    let v = rt.vector_get(frame, index as usize)?;
                    self.stack.push(rt, v);
                }

                Opcode::Lset => {
                    let depth = instr::arg_fixnum(rt, instr_cell, false)?;
                    let index = instr::arg_fixnum(rt, instr_cell, true)?;
                    let env_val = rt.root(env_guard);
                    let frame = env::frame_at(rt, env_val, depth)?;
                    let v = self.stack.top(rt)?;
                    rt.vector_set(frame, index as usize, v)?;
                }

                Opcode::Save => {
                    let target = instr::arg_fixnum(rt, instr_cell, false)? as usize;
                    self.push_save_frame(rt, target, fn_guard, env_guard)?;
                }

                Opcode::Cc => self.make_continuation(rt)?,
                Opcode::Setcc => self.reinstate_stack(rt)?,
                Opcode::Pop => {
                    self.stack.pop(rt)?;
                }

                Opcode::Fcallj | Opcode::Callj => {
                    let reuse_env = matches!(op, Opcode::Callj);
                    let declared = instr::arg_fixnum(rt, instr_cell, false)?;

                    let mut target = self.stack.pop(rt)?;
                    if let Ok((inner, _)) = rt.meta_proc_fields(target) {
                        target = inner;
                    }

                    let call_n_args = if reuse_env && declared == -1 {
                        self.splat_apply_args(rt, target)?
                    } else {
                        declared
                    };

                    match self.enter_call(rt, target, call_n_args, reuse_env, fn_guard, env_guard)? {
                        Entered::Jump { bytecode, pc: new_pc } => {
                            fn_code = bytecode;
                            pc = new_pc;
                            current_n_args = call_n_args;
                        }
                        Entered::RanPrimitive => match self.finish_return(rt, initial_top, fn_guard, env_guard)? {
                            ReturnOutcome::Done(v) => return Ok(v),
                            ReturnOutcome::Resume { pc: new_pc } => {
                                pc = new_pc;
                                let resumed = rt.root(fn_guard);
                                fn_code = rt.compiled_proc_fields(resumed)?.0;
                            }
                        },
                    }
                }

                Opcode::Return => match self.finish_return(rt, initial_top, fn_guard, env_guard)? {
                    ReturnOutcome::Done(v) => return Ok(v),
                    ReturnOutcome::Resume { pc: new_pc } => {
                        pc = new_pc;
                        let resumed = rt.root(fn_guard);
                        fn_code = rt.compiled_proc_fields(resumed)?.0;
                    }
                },
            }
        }
    }

    /// `apply`'s argument-list splat (`callj -1`, §4.4.3): `target` is
    /// already the function to call (popped by the caller before this
    /// runs); the top of the stack now holds the argument list to spread.
    /// Each element is pushed in order so the callee's own `args`/
    /// `argsdot` sees an ordinary argument window.
    fn splat_apply_args(&mut self, rt: &mut Runtime, _target: ObjectRef) -> Result<i64> {
        let arg_list = self.stack.pop(rt)?;
        let mut count = 0i64;
        let mut cursor = arg_list;
        while cursor != ObjectRef::Nil {
            let item = rt.car(cursor)?;
            self.stack.push(rt, item);
            cursor = rt.cdr(cursor)?;
            count += 1;
        }
        Ok(count)
    }

    /// Enter `target`: run it immediately if it's a primitive, otherwise
    /// rewire `fn_guard`/`env_guard` to start executing its bytecode.
    /// `reuse_env` is the `callj` (tail call) vs `fcallj` (non-tail call)
    /// distinction (§4.4.2/§4.4.3): a tail call mutates the live env
    /// cons's `cdr` in place, preserving its identity; a non-tail call
    /// allocates a fresh one, leaving the caller's env untouched.
    fn enter_call(
        &mut self,
        rt: &mut Runtime,
        target: ObjectRef,
        n_args: i64,
        reuse_env: bool,
        fn_guard: RootGuard,
        env_guard: RootGuard,
    ) -> Result<Entered> {
        let mut target = target;
        if let Ok((inner, _)) = rt.meta_proc_fields(target) {
            target = inner;
        }

        if let Ok(handle) = rt.primitive_proc_id(target) {
            emit(VmEvent::PrimitiveCalled { n_args });
            let n = n_args as usize;
            let stack_top = self.stack.len();
            let value = self.primitives.call(handle, &self.stack, n, stack_top, rt)?;
            self.stack.pop_discard(rt, n)?;
            self.stack.push(rt, value);
            return Ok(Entered::RanPrimitive);
        }

        let (bytecode, captured_env) = rt
            .compiled_proc_fields(target)
            .map_err(|_| VmError::NotCallable)?;

        if reuse_env {
            let current_env = rt.root(env_guard);
            rt.set_cdr(current_env, captured_env)?;
        } else {
            let new_env = rt.alloc_pair(ObjectRef::Nil, captured_env)?;
            rt.reroot(env_guard, new_env);
        }
        rt.reroot(fn_guard, target);

        emit(VmEvent::ProcEntered { n_args, tail_call: reuse_env });
        Ok(Entered::Jump { bytecode, pc: 0 })
    }

    /// The shared tail of both an explicit `Return` instruction and a
    /// primitive call finishing (§4.4.4, `RETURN_OPCODE_INSTRUCTIONS` in
    /// the original): if exactly one value sits above this `execute`
    /// call's own entry depth, that value is the real result and the
    /// Rust call unwinds; otherwise the slot below it is a continuation
    /// triple `(pc . (fn . env))` built by `save`, which is restored and
    /// dispatch resumes there with the value pushed back.
    fn finish_return(
        &mut self,
        rt: &mut Runtime,
        initial_top: usize,
        fn_guard: RootGuard,
        env_guard: RootGuard,
    ) -> Result<ReturnOutcome> {
        let value = self.stack.pop(rt)?;
        if self.stack.len() == initial_top {
            return Ok(ReturnOutcome::Done(value));
        }

        let cont = self.stack.pop(rt)?;
        let pc_obj = rt.car(cont)?;
        let target_pc = rt
            .fixnum_value(pc_obj)
            .ok_or(VmError::BadOperand("saved continuation pc is not a fixnum"))? as usize;
        let rest = rt.cdr(cont)?;
        let new_fn = rt.car(rest)?;
        let new_env = rt.cdr(rest)?;

        rt.reroot(fn_guard, new_fn);
        rt.reroot(env_guard, new_env);
        self.stack.push(rt, value);

        Ok(ReturnOutcome::Resume { pc: target_pc })
    }

    /// `args n`: the callee's frame vector holds exactly `n` values,
    /// popped off the top of the stack (reversed back into left-to-right
    /// order) and installed as the innermost frame of the current env.
    fn bind_fixed_args(
        &mut self,
        rt: &mut Runtime,
        instr_cell: ObjectRef,
        env_guard: RootGuard,
        n_args: i64,
    ) -> Result<()> {
        let n = instr::arg_fixnum(rt, instr_cell, false)?;
        if n != n_args {
            return Err(VmError::ArgCountMismatch { expected: n, got: n_args });
        }
        let nu = n as usize;

        let frame = rt.alloc_vector(nu, ObjectRef::Nil)?;
        let frame_guard = rt.pin(frame);
        for i in (0..nu).rev() {
            let v = self.stack.pop(rt)?;
            let frame_val = rt.root(frame_guard);
            rt.vector_set(frame_val, i, v)?;
        }
        let env_val = rt.root(env_guard);
        let frame_val = rt.root(frame_guard);
        rt.set_car(env_val, frame_val)?;
        rt.unpin(frame_guard)?;
        Ok(())
    }

    /// `argsdot n`: like `args`, but at least `n` arguments are required;
    /// anything beyond the first `n` is collected into a proper list in
    /// the frame's final slot (§4.3, the rest-parameter case).
    fn bind_rest_args(
        &mut self,
        rt: &mut Runtime,
        instr_cell: ObjectRef,
        env_guard: RootGuard,
        n_args: i64,
    ) -> Result<()> {
        let n = instr::arg_fixnum(rt, instr_cell, false)?;
        if n_args < n {
            return Err(VmError::ArgCountMismatch { expected: n, got: n_args });
        }
        let nu = n as usize;
        let extra = (n_args - n) as usize;

        let frame = rt.alloc_vector(nu + 1, ObjectRef::Nil)?;
        let frame_guard = rt.pin(frame);

        let mut rest_guard = rt.pin(ObjectRef::Nil);
        for _ in 0..extra {
            let v = self.stack.pop(rt)?;
            let v_guard = rt.pin(v);
            let rest_val = rt.root(rest_guard);
            let pair = rt.alloc_pair(v, rest_val)?;
            rt.unpin(v_guard)?;
            rt.reroot(rest_guard, pair);
        }
        let rest = rt.root(rest_guard);
        let frame_val = rt.root(frame_guard);
        rt.vector_set(frame_val, nu, rest)?;
        rt.unpin(rest_guard)?;

        for i in (0..nu).rev() {
            let v = self.stack.pop(rt)?;
            let frame_val = rt.root(frame_guard);
            rt.vector_set(frame_val, i, v)?;
        }
        let env_val = rt.root(env_guard);
        let frame_val = rt.root(frame_guard);
        rt.set_car(env_val, frame_val)?;
        rt.unpin(frame_guard)?;
        Ok(())
    }

    /// `save target_pc`: push a continuation triple `(target_pc . (fn .
    /// env))` recording where and in which frame to resume once the call
    /// that follows eventually returns (§4.4.4). Emitted ahead of every
    /// non-tail call's argument-evaluating instructions, pairing with the
    /// matching `fcallj`.
    fn push_save_frame(
        &mut self,
        rt: &mut Runtime,
        target_pc: usize,
        fn_guard: RootGuard,
        env_guard: RootGuard,
    ) -> Result<()> {
        let pc_obj = rt.alloc_fixnum(target_pc as i64)?;
        let pc_guard = rt.pin(pc_obj);

        let fn_val = rt.root(fn_guard);
        let env_val = rt.root(env_guard);
        let inner = rt.alloc_pair(fn_val, env_val)?;
        let inner_guard = rt.pin(inner);

        let pc_val = rt.root(pc_guard);
        let inner_val = rt.root(inner_guard);
        let triple = rt.alloc_pair(pc_val, inner_val)?;
        rt.unpin(inner_guard)?;
        rt.unpin(pc_guard)?;

        self.stack.push(rt, triple);
        Ok(())
    }

    /// `cc` (§4.4.1): snapshot the live value stack into a genuine
    /// `Vector` and wrap it, together with its depth, as the captured
    /// environment of a closure running `cc_bytecode`. Calling that
    /// closure later reinstates this exact stack via `setcc`.
    fn make_continuation(&mut self, rt: &mut Runtime) -> Result<()> {
        let len = self.stack.len();
        let snap = rt.alloc_vector(len, ObjectRef::Nil)?;
        let snap_guard = rt.pin(snap);
        for i in 0..len {
            let v = self.stack.get(rt, i)?;
            let snap_val = rt.root(snap_guard);
            rt.vector_set(snap_val, i, v)?;
        }

        let top_obj = rt.alloc_fixnum(len as i64)?;
        let top_guard = rt.pin(top_obj);

        let frame = rt.alloc_vector(2, ObjectRef::Nil)?;
        let frame_guard = rt.pin(frame);
        let snap_val = rt.root(snap_guard);
        let frame_val = rt.root(frame_guard);
        rt.vector_set(frame_val, 0, snap_val)?;
        let top_val = rt.root(top_guard);
        let frame_val = rt.root(frame_guard);
        rt.vector_set(frame_val, 1, top_val)?;
        rt.unpin(top_guard)?;
        rt.unpin(snap_guard)?;

        let frame_val = rt.root(frame_guard);
        let wrapper_env = rt.alloc_pair(frame_val, ObjectRef::Nil)?;
        rt.unpin(frame_guard)?;
        let wrapper_guard = rt.pin(wrapper_env);

        let wrapper_val = rt.root(wrapper_guard);
        let closure = rt.alloc_compiled_proc(self.cc_bytecode, wrapper_val)?;
        rt.unpin(wrapper_guard)?;

        emit(VmEvent::ContinuationCaptured { stack_depth: len });
        self.stack.push(rt, closure);
        Ok(())
    }

    /// `setcc`: pop the captured stack-vector and its recorded depth (in
    /// that order; `cc_bytecode` pushes the depth first, the vector
    /// second), discard the live stack entirely, and rebuild it from the
    /// snapshot. The original's C source reads `stack = car(stack)` at
    /// this point, which applies a pair accessor to what the surrounding
    /// code treats as a vector and cannot be the intended operation; this
    /// rebuilds the stack from the captured snapshot instead, which is
    /// the behavior a working `call/cc` round trip requires.
    fn reinstate_stack(&mut self, rt: &mut Runtime) -> Result<()> {
        let captured_vector = self.stack.pop(rt)?;
        let captured_top_obj = self.stack.pop(rt)?;
        let captured_top = rt
            .fixnum_value(captured_top_obj)
            .ok_or(VmError::BadOperand("captured stack depth is not a fixnum"))? as usize;

        self.stack.truncate(rt, 0)?;
        for i in 0..captured_top {
            let v = rt.vector_get(captured_vector, i)?;
            self.stack.push(rt, v);
        }
        emit(VmEvent::ContinuationInvoked { stack_depth: captured_top });
        Ok(())
    }
}

/// Convenience for callers that don't need a persistent `Vm`: assemble
/// nothing, just run `callee` against `args` once.
pub fn call(rt: &mut Runtime, vm: &mut Vm, callee: ObjectRef, args: &[ObjectRef]) -> Result<ObjectRef> {
    for arg in args {
        vm.push_arg(rt, *arg);
    }
    vm.execute(rt, callee, args.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_gc::GcConfig;

    fn new_rt() -> Runtime {
        Runtime::new(GcConfig::default()).unwrap()
    }

    /// `(lambda (x) x)` applied to `7`: `args 1; lvar 0 0; return`.
    #[test]
    fn identity_closure_returns_its_argument() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        let one = assemble::fixnum(&mut rt, 1).unwrap();
        let i0 = assemble::make_instr(&mut rt, Opcode::Args, one, ObjectRef::Nil).unwrap();
        let depth0 = assemble::fixnum(&mut rt, 0).unwrap();
        let index0 = assemble::fixnum(&mut rt, 0).unwrap();
        let i1 = assemble::make_instr(&mut rt, Opcode::Lvar, depth0, index0).unwrap();
        let i2 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let bytecode = assemble::make_bytecode(&mut rt, &[i0, i1, i2]).unwrap();

        let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil).unwrap();
        let seven = rt.alloc_fixnum(7).unwrap();

        let result = call(&mut rt, &mut vm, proc, &[seven]).unwrap();
        assert_eq!(rt.fixnum_value(result), Some(7));
    }

    /// A primitive addition invoked directly as the callee.
    #[test]
    fn primitive_call_returns_its_result() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        let handle = vm.primitives_mut().register(|stack, n_args, stack_top, rt| {
            let a = rt.fixnum_value(stack.get(rt, stack_top - n_args)?).unwrap();
            let b = rt.fixnum_value(stack.get(rt, stack_top - n_args + 1)?).unwrap();
            Ok(rt.alloc_fixnum(a + b)?)
        });
        let prim = rt.alloc_primitive_proc(handle).unwrap();

        let a = rt.alloc_fixnum(3).unwrap();
        let b = rt.alloc_fixnum(4).unwrap();
        let result = call(&mut rt, &mut vm, prim, &[a, b]).unwrap();
        assert_eq!(rt.fixnum_value(result), Some(7));
    }

    /// A wrong declared arity must fail `args`' check rather than silently
    /// binding the wrong frame shape.
    #[test]
    fn wrong_arity_is_rejected() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        let two = assemble::fixnum(&mut rt, 2).unwrap();
        let i0 = assemble::make_instr(&mut rt, Opcode::Args, two, ObjectRef::Nil).unwrap();
        let i1 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let bytecode = assemble::make_bytecode(&mut rt, &[i0, i1]).unwrap();
        let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil).unwrap();

        let one = rt.alloc_fixnum(1).unwrap();
        let result = call(&mut rt, &mut vm, proc, &[one]);
        assert!(matches!(result, Err(VmError::ArgCountMismatch { expected: 2, got: 1 })));
    }

    /// `argsdot 1` with three actual arguments: the first binds normally,
    /// the remaining two land in the frame's rest slot as a proper list
    /// `(b c)`, read back via `lvar 0 1` and its `cdr`.
    #[test]
    fn rest_parameter_collects_extra_arguments_into_a_list() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        let one = assemble::fixnum(&mut rt, 1).unwrap();
        let i0 = assemble::make_instr(&mut rt, Opcode::ArgsDot, one, ObjectRef::Nil).unwrap();
        let d0 = assemble::fixnum(&mut rt, 0).unwrap();
        let ix1 = assemble::fixnum(&mut rt, 1).unwrap();
        let i1 = assemble::make_instr(&mut rt, Opcode::Lvar, d0, ix1).unwrap();
        let i2 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let bytecode = assemble::make_bytecode(&mut rt, &[i0, i1, i2]).unwrap();
        let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil).unwrap();

        let a = rt.alloc_fixnum(1).unwrap();
        let b = rt.alloc_fixnum(2).unwrap();
        let c = rt.alloc_fixnum(3).unwrap();
        let rest = call(&mut rt, &mut vm, proc, &[a, b, c]).unwrap();

        assert_eq!(rt.fixnum_value(rt.car(rest).unwrap()), Some(2));
        assert_eq!(rt.fixnum_value(rt.car(rt.cdr(rest).unwrap()).unwrap()), Some(3));
        assert_eq!(rt.cdr(rt.cdr(rest).unwrap()).unwrap(), ObjectRef::Nil);
    }

    /// A hand-assembled non-tail call: `save L; const 1; const <callee>;
    /// fcallj 1; L: return`. Proves the `save`/`fcallj` pairing and the
    /// fresh-env-on-non-tail-call path both work end to end.
    #[test]
    fn non_tail_call_returns_through_a_save_frame() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        // callee: (lambda (x) x)
        let one_const = assemble::fixnum(&mut rt, 1).unwrap();
        let c0 = assemble::make_instr(&mut rt, Opcode::Args, one_const, ObjectRef::Nil).unwrap();
        let d0 = assemble::fixnum(&mut rt, 0).unwrap();
        let ix0 = assemble::fixnum(&mut rt, 0).unwrap();
        let c1 = assemble::make_instr(&mut rt, Opcode::Lvar, d0, ix0).unwrap();
        let c2 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let callee_bytecode = assemble::make_bytecode(&mut rt, &[c0, c1, c2]).unwrap();
        let callee = rt.alloc_compiled_proc(callee_bytecode, ObjectRef::Nil).unwrap();

        // caller: args 0; save 5; const 9; const callee; fcallj 1; return
        // (the save target is the index of the `return` instruction, the
        // one right after `fcallj`, where the caller resumes once the
        // callee's own return-sequence hands control back)
        let zero = assemble::fixnum(&mut rt, 0).unwrap();
        let m0 = assemble::make_instr(&mut rt, Opcode::Args, zero, ObjectRef::Nil).unwrap();
        let resume_at = assemble::fixnum(&mut rt, 5).unwrap();
        let m1 = assemble::make_instr(&mut rt, Opcode::Save, resume_at, ObjectRef::Nil).unwrap();
        let nine = assemble::fixnum(&mut rt, 9).unwrap();
        let m2 = assemble::make_instr(&mut rt, Opcode::Const, nine, ObjectRef::Nil).unwrap();
        let m3 = assemble::make_instr(&mut rt, Opcode::Const, callee, ObjectRef::Nil).unwrap();
        let one_arg = assemble::fixnum(&mut rt, 1).unwrap();
        let m4 = assemble::make_instr(&mut rt, Opcode::Fcallj, one_arg, ObjectRef::Nil).unwrap();
        let m5 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let caller_bytecode = assemble::make_bytecode(&mut rt, &[m0, m1, m2, m3, m4, m5]).unwrap();
        let caller = rt.alloc_compiled_proc(caller_bytecode, ObjectRef::Nil).unwrap();

        let result = call(&mut rt, &mut vm, caller, &[]).unwrap();
        assert_eq!(rt.fixnum_value(result), Some(9));
    }

    /// A tail call (`callj`) mutates the current env cons in place rather
    /// than allocating a fresh one, unlike `fcallj`.
    #[test]
    fn tail_call_reuses_the_current_env_cons_identity() {
        let mut rt = new_rt();
        let mut vm = Vm::new(&mut rt).unwrap();

        let one = assemble::fixnum(&mut rt, 1).unwrap();
        let callee0 = assemble::make_instr(&mut rt, Opcode::Args, one, ObjectRef::Nil).unwrap();
        let d0 = assemble::fixnum(&mut rt, 0).unwrap();
        let ix0 = assemble::fixnum(&mut rt, 0).unwrap();
        let callee1 = assemble::make_instr(&mut rt, Opcode::Lvar, d0, ix0).unwrap();
        let callee2 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
        let callee_bytecode = assemble::make_bytecode(&mut rt, &[callee0, callee1, callee2]).unwrap();
        let callee = rt.alloc_compiled_proc(callee_bytecode, ObjectRef::Nil).unwrap();

        let zero = assemble::fixnum(&mut rt, 0).unwrap();
        let m0 = assemble::make_instr(&mut rt, Opcode::Args, zero, ObjectRef::Nil).unwrap();
        let five = assemble::fixnum(&mut rt, 5).unwrap();
        let m1 = assemble::make_instr(&mut rt, Opcode::Const, five, ObjectRef::Nil).unwrap();
        let m2 = assemble::make_instr(&mut rt, Opcode::Const, callee, ObjectRef::Nil).unwrap();
        let one_arg = assemble::fixnum(&mut rt, 1).unwrap();
        let m3 = assemble::make_instr(&mut rt, Opcode::Callj, one_arg, ObjectRef::Nil).unwrap();
        let caller_bytecode = assemble::make_bytecode(&mut rt, &[m0, m1, m2, m3]).unwrap();
        let caller = rt.alloc_compiled_proc(caller_bytecode, ObjectRef::Nil).unwrap();

        let result = call(&mut rt, &mut vm, caller, &[]).unwrap();
        assert_eq!(rt.fixnum_value(result), Some(5));
    }
}
