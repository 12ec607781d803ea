//! Hand-assembled demo programs, one per concrete scenario in §8 of the
//! design docs. There is no compiler in this workspace (§3.2 Non-goals),
//! so every program here is built the same way a test harness builds
//! one: with `rime_vm::assemble`.

use clap::ValueEnum;
use rime_gc::{ObjectRef, Runtime};
use rime_vm::{assemble, Opcode, Vm, VmError};

use crate::error::Result;

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProgramName {
    /// `(+ 1 2)`
    Plus,
    /// `((lambda (x) x) 7)`
    Identity,
    /// `((lambda (x y . rest) rest) 1 2 3 4)`
    RestArgs,
    /// `(if #f 1 2)`
    IfFalse,
    /// `(call/cc (lambda (k) (+ 1 (k 5))))`
    CallCc,
    /// a self-tail-recursive countdown from `--iterations` to 0
    TailLoop,
}

fn expect_fixnum(rt: &Runtime, obj: ObjectRef) -> rime_vm::Result<i64> {
    rt.fixnum_value(obj).ok_or(VmError::BadOperand("expected a fixnum argument"))
}

/// Registers the small primitive set every program here might need:
/// variadic `+`, `zero?`, `dec`.
fn register_primitives(rt: &mut Runtime, vm: &mut Vm) -> Result<()> {
    let plus = vm.primitives_mut().register(|stack, n_args, stack_top, rt| {
        let mut sum = 0i64;
        for i in 0..n_args {
            sum += expect_fixnum(rt, stack.get(rt, stack_top - n_args + i)?)?;
        }
        Ok(rt.alloc_fixnum(sum)?)
    });
    let plus_proc = rt.alloc_primitive_proc(plus)?;
    let plus_sym = rt.intern("+");
    rt.define_global(plus_sym, plus_proc);

    let zero = vm.primitives_mut().register(|stack, n_args, stack_top, rt| {
        let n = expect_fixnum(rt, stack.get(rt, stack_top - n_args)?)?;
        Ok(ObjectRef::Bool(n == 0))
    });
    let zero_proc = rt.alloc_primitive_proc(zero)?;
    let zero_sym = rt.intern("zero?");
    rt.define_global(zero_sym, zero_proc);

    let dec = vm.primitives_mut().register(|stack, n_args, stack_top, rt| {
        let n = expect_fixnum(rt, stack.get(rt, stack_top - n_args)?)?;
        Ok(rt.alloc_fixnum(n - 1)?)
    });
    let dec_proc = rt.alloc_primitive_proc(dec)?;
    let dec_sym = rt.intern("dec");
    rt.define_global(dec_sym, dec_proc);
    Ok(())
}

/// `[const 1; const 2; gvar +; callj 2]`.
fn plus_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let one = assemble::fixnum(rt, 1)?;
    let i0 = assemble::make_instr(rt, Opcode::Const, one, ObjectRef::Nil)?;
    let two = assemble::fixnum(rt, 2)?;
    let i1 = assemble::make_instr(rt, Opcode::Const, two, ObjectRef::Nil)?;
    let plus_sym_obj = rt.alloc_symbol("+")?;
    let i2 = assemble::make_instr(rt, Opcode::Gvar, plus_sym_obj, ObjectRef::Nil)?;
    let two_args = assemble::fixnum(rt, 2)?;
    let i3 = assemble::make_instr(rt, Opcode::Callj, two_args, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(rt, &[i0, i1, i2, i3])?)
}

/// `const 7; const identity-closure; callj 1`, where `identity-closure`
/// compiles `(lambda (x) x)` as `args 1; lvar 0 0; return`.
fn identity_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let one = assemble::fixnum(rt, 1)?;
    let l0 = assemble::make_instr(rt, Opcode::Args, one, ObjectRef::Nil)?;
    let d0 = assemble::fixnum(rt, 0)?;
    let ix0 = assemble::fixnum(rt, 0)?;
    let l1 = assemble::make_instr(rt, Opcode::Lvar, d0, ix0)?;
    let l2 = assemble::make_instr(rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil)?;
    let lambda_bytecode = assemble::make_bytecode(rt, &[l0, l1, l2])?;
    let lambda = rt.alloc_compiled_proc(lambda_bytecode, ObjectRef::Nil)?;

    let seven = assemble::fixnum(rt, 7)?;
    let o0 = assemble::make_instr(rt, Opcode::Const, seven, ObjectRef::Nil)?;
    let o1 = assemble::make_instr(rt, Opcode::Const, lambda, ObjectRef::Nil)?;
    let one_arg = assemble::fixnum(rt, 1)?;
    let o2 = assemble::make_instr(rt, Opcode::Callj, one_arg, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(rt, &[o0, o1, o2])?)
}

/// `((lambda (x y . rest) rest) 1 2 3 4)` via `argsdot 2; lvar 0 2;
/// return`, applied by pushing the four arguments and calling with
/// `callj 4`.
fn rest_args_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let two = assemble::fixnum(rt, 2)?;
    let l0 = assemble::make_instr(rt, Opcode::ArgsDot, two, ObjectRef::Nil)?;
    let d0 = assemble::fixnum(rt, 0)?;
    let ix2 = assemble::fixnum(rt, 2)?;
    let l1 = assemble::make_instr(rt, Opcode::Lvar, d0, ix2)?;
    let l2 = assemble::make_instr(rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil)?;
    let lambda_bytecode = assemble::make_bytecode(rt, &[l0, l1, l2])?;
    let lambda = rt.alloc_compiled_proc(lambda_bytecode, ObjectRef::Nil)?;

    let one = assemble::fixnum(rt, 1)?;
    let o0 = assemble::make_instr(rt, Opcode::Const, one, ObjectRef::Nil)?;
    let two_c = assemble::fixnum(rt, 2)?;
    let o1 = assemble::make_instr(rt, Opcode::Const, two_c, ObjectRef::Nil)?;
    let three = assemble::fixnum(rt, 3)?;
    let o2 = assemble::make_instr(rt, Opcode::Const, three, ObjectRef::Nil)?;
    let four = assemble::fixnum(rt, 4)?;
    let o3 = assemble::make_instr(rt, Opcode::Const, four, ObjectRef::Nil)?;
    let o4 = assemble::make_instr(rt, Opcode::Const, lambda, ObjectRef::Nil)?;
    let four_args = assemble::fixnum(rt, 4)?;
    let o5 = assemble::make_instr(rt, Opcode::Callj, four_args, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(rt, &[o0, o1, o2, o3, o4, o5])?)
}

/// `[const #f; fjump L; const 1; jump E; L: const 2; E: return]`.
fn if_false_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let i0 = assemble::make_instr(rt, Opcode::Const, ObjectRef::Bool(false), ObjectRef::Nil)?;
    let target_l = assemble::fixnum(rt, 4)?;
    let i1 = assemble::make_instr(rt, Opcode::Fjump, target_l, ObjectRef::Nil)?;
    let one = assemble::fixnum(rt, 1)?;
    let i2 = assemble::make_instr(rt, Opcode::Const, one, ObjectRef::Nil)?;
    let target_e = assemble::fixnum(rt, 5)?;
    let i3 = assemble::make_instr(rt, Opcode::Jump, target_e, ObjectRef::Nil)?;
    let two = assemble::fixnum(rt, 2)?;
    let i4 = assemble::make_instr(rt, Opcode::Const, two, ObjectRef::Nil)?;
    let i5 = assemble::make_instr(rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(rt, &[i0, i1, i2, i3, i4, i5])?)
}

/// `(call/cc (lambda (k) (+ 1 (k 5))))`, which abandons the pending
/// `(+ 1 ...)` continuation when `k` is invoked.
fn call_cc_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let one = assemble::fixnum(rt, 1)?;
    let k0 = assemble::make_instr(rt, Opcode::Args, one, ObjectRef::Nil)?;
    let one_c = assemble::fixnum(rt, 1)?;
    let k1 = assemble::make_instr(rt, Opcode::Const, one_c, ObjectRef::Nil)?;
    let resume_at = assemble::fixnum(rt, 6)?;
    let k2 = assemble::make_instr(rt, Opcode::Save, resume_at, ObjectRef::Nil)?;
    let five = assemble::fixnum(rt, 5)?;
    let k3 = assemble::make_instr(rt, Opcode::Const, five, ObjectRef::Nil)?;
    let d0 = assemble::fixnum(rt, 0)?;
    let ix0 = assemble::fixnum(rt, 0)?;
    let k4 = assemble::make_instr(rt, Opcode::Lvar, d0, ix0)?;
    let one_arg = assemble::fixnum(rt, 1)?;
    let k5 = assemble::make_instr(rt, Opcode::Fcallj, one_arg, ObjectRef::Nil)?;
    let plus_sym_obj = rt.alloc_symbol("+")?;
    let k6 = assemble::make_instr(rt, Opcode::Gvar, plus_sym_obj, ObjectRef::Nil)?;
    let two_args = assemble::fixnum(rt, 2)?;
    let k7 = assemble::make_instr(rt, Opcode::Callj, two_args, ObjectRef::Nil)?;
    let k_bytecode = assemble::make_bytecode(rt, &[k0, k1, k2, k3, k4, k5, k6, k7])?;
    let k_closure = rt.alloc_compiled_proc(k_bytecode, ObjectRef::Nil)?;

    let o0 = assemble::make_instr(rt, Opcode::Cc, ObjectRef::Nil, ObjectRef::Nil)?;
    let o1 = assemble::make_instr(rt, Opcode::Const, k_closure, ObjectRef::Nil)?;
    let one_arg2 = assemble::fixnum(rt, 1)?;
    let o2 = assemble::make_instr(rt, Opcode::Fcallj, one_arg2, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(rt, &[o0, o1, o2])?)
}

/// A self-tail-recursive countdown, `(loop n) = (if (zero? n) 0 (loop
/// (dec n)))`, calling itself through its own global binding via
/// `callj` so the chain runs in O(1) native stack regardless of `n`.
fn tail_loop_bytecode(rt: &mut Runtime, loop_sym: rime_util::Symbol) -> Result<ObjectRef> {
    let one = assemble::fixnum(rt, 1)?;
    let i0 = assemble::make_instr(rt, Opcode::Args, one, ObjectRef::Nil)?;
    let resume_a = assemble::fixnum(rt, 5)?;
    let i1 = assemble::make_instr(rt, Opcode::Save, resume_a, ObjectRef::Nil)?;
    let d0a = assemble::fixnum(rt, 0)?;
    let ix0a = assemble::fixnum(rt, 0)?;
    let i2 = assemble::make_instr(rt, Opcode::Lvar, d0a, ix0a)?;
    let zero_sym_obj = rt.alloc_symbol("zero?")?;
    let i3 = assemble::make_instr(rt, Opcode::Gvar, zero_sym_obj, ObjectRef::Nil)?;
    let one_arg_a = assemble::fixnum(rt, 1)?;
    let i4 = assemble::make_instr(rt, Opcode::Fcallj, one_arg_a, ObjectRef::Nil)?;
    let base_target = assemble::fixnum(rt, 12)?;
    let i5 = assemble::make_instr(rt, Opcode::Tjump, base_target, ObjectRef::Nil)?;
    let resume_b = assemble::fixnum(rt, 10)?;
    let i6 = assemble::make_instr(rt, Opcode::Save, resume_b, ObjectRef::Nil)?;
    let d0b = assemble::fixnum(rt, 0)?;
    let ix0b = assemble::fixnum(rt, 0)?;
    let i7 = assemble::make_instr(rt, Opcode::Lvar, d0b, ix0b)?;
    let dec_sym_obj = rt.alloc_symbol("dec")?;
    let i8 = assemble::make_instr(rt, Opcode::Gvar, dec_sym_obj, ObjectRef::Nil)?;
    let one_arg_b = assemble::fixnum(rt, 1)?;
    let i9 = assemble::make_instr(rt, Opcode::Fcallj, one_arg_b, ObjectRef::Nil)?;
    let loop_name = rt.symbol_name(loop_sym).to_string();
    let loop_sym_obj = rt.alloc_symbol(&loop_name)?;
    let i10 = assemble::make_instr(rt, Opcode::Gvar, loop_sym_obj, ObjectRef::Nil)?;
    let one_arg_c = assemble::fixnum(rt, 1)?;
    let i11 = assemble::make_instr(rt, Opcode::Callj, one_arg_c, ObjectRef::Nil)?;
    let zero_const = assemble::fixnum(rt, 0)?;
    let i12 = assemble::make_instr(rt, Opcode::Const, zero_const, ObjectRef::Nil)?;
    let i13 = assemble::make_instr(rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil)?;
    Ok(assemble::make_bytecode(
        rt,
        &[i0, i1, i2, i3, i4, i5, i6, i7, i8, i9, i10, i11, i12, i13],
    )?)
}

/// Builds the named program's entry procedure and its call arguments,
/// registering whatever primitives and globals it needs along the way.
pub fn build(rt: &mut Runtime, vm: &mut Vm, name: ProgramName, iterations: i64) -> Result<(ObjectRef, Vec<ObjectRef>)> {
    register_primitives(rt, vm)?;

    match name {
        ProgramName::Plus => {
            let bytecode = plus_bytecode(rt)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            Ok((proc, vec![]))
        }
        ProgramName::Identity => {
            let bytecode = identity_bytecode(rt)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            Ok((proc, vec![]))
        }
        ProgramName::RestArgs => {
            let bytecode = rest_args_bytecode(rt)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            Ok((proc, vec![]))
        }
        ProgramName::IfFalse => {
            let bytecode = if_false_bytecode(rt)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            Ok((proc, vec![]))
        }
        ProgramName::CallCc => {
            let bytecode = call_cc_bytecode(rt)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            Ok((proc, vec![]))
        }
        ProgramName::TailLoop => {
            let loop_sym = rt.intern("loop");
            let bytecode = tail_loop_bytecode(rt, loop_sym)?;
            let proc = rt.alloc_compiled_proc(bytecode, ObjectRef::Nil)?;
            rt.define_global(loop_sym, proc);
            let start = rt.alloc_fixnum(iterations)?;
            Ok((proc, vec![start]))
        }
    }
}
