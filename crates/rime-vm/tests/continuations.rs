//! The two `call/cc` laws: a captured continuation used once round-trips
//! like an ordinary return, and a captured continuation invoked again
//! later, after the call that captured it has already returned, still
//! restores the exact context it was captured in.

use rime_gc::{GcConfig, ObjectRef, Runtime};
use rime_vm::{assemble, call, Opcode, Vm};

fn new_rt() -> Runtime {
    Runtime::new(GcConfig::default()).unwrap()
}

fn register_plus(rt: &mut Runtime, vm: &mut Vm) -> ObjectRef {
    let handle = vm.primitives_mut().register(|stack, n_args, stack_top, rt| {
        let mut sum = 0i64;
        for i in 0..n_args {
            sum += rt.fixnum_value(stack.get(rt, stack_top - n_args + i)?).unwrap();
        }
        Ok(rt.alloc_fixnum(sum)?)
    });
    rt.alloc_primitive_proc(handle).unwrap()
}

/// `(call/cc (lambda (k) (k 42)))` → 42: calling the continuation
/// immediately, with nothing pending below it, behaves like an ordinary
/// return of its argument.
#[test]
fn round_trip_through_an_immediately_invoked_continuation() {
    let mut rt = new_rt();
    let mut vm = Vm::new(&mut rt).unwrap();

    // (lambda (k) (k 42)): args 1; const 42; lvar 0 0; callj 1
    let one = assemble::fixnum(&mut rt, 1).unwrap();
    let b0 = assemble::make_instr(&mut rt, Opcode::Args, one, ObjectRef::Nil).unwrap();
    let forty_two = assemble::fixnum(&mut rt, 42).unwrap();
    let b1 = assemble::make_instr(&mut rt, Opcode::Const, forty_two, ObjectRef::Nil).unwrap();
    let d0 = assemble::fixnum(&mut rt, 0).unwrap();
    let ix0 = assemble::fixnum(&mut rt, 0).unwrap();
    let b2 = assemble::make_instr(&mut rt, Opcode::Lvar, d0, ix0).unwrap();
    let one_arg = assemble::fixnum(&mut rt, 1).unwrap();
    let b3 = assemble::make_instr(&mut rt, Opcode::Callj, one_arg, ObjectRef::Nil).unwrap();
    let lambda_bytecode = assemble::make_bytecode(&mut rt, &[b0, b1, b2, b3]).unwrap();
    let lambda = rt.alloc_compiled_proc(lambda_bytecode, ObjectRef::Nil).unwrap();

    // (call/cc lambda): cc; const lambda; fcallj 1
    let o0 = assemble::make_instr(&mut rt, Opcode::Cc, ObjectRef::Nil, ObjectRef::Nil).unwrap();
    let o1 = assemble::make_instr(&mut rt, Opcode::Const, lambda, ObjectRef::Nil).unwrap();
    let one_arg2 = assemble::fixnum(&mut rt, 1).unwrap();
    let o2 = assemble::make_instr(&mut rt, Opcode::Fcallj, one_arg2, ObjectRef::Nil).unwrap();
    let outer_bytecode = assemble::make_bytecode(&mut rt, &[o0, o1, o2]).unwrap();
    let outer = rt.alloc_compiled_proc(outer_bytecode, ObjectRef::Nil).unwrap();

    let result = call(&mut rt, &mut vm, outer, &[]).unwrap();
    assert_eq!(rt.fixnum_value(result), Some(42));
}

/// Capturing `k` in `(+ 1 (call/cc (lambda (c) (set! k c) 10)))` yields
/// 11 the first time through; invoking the stashed `k` afterward, in a
/// completely separate top-level call, restores the `(+ 1 ...)` context
/// and yields 101. `set!` on a top-level variable is modeled as `gset`
/// against the global environment (no local binding survives between
/// the two separate `execute()` calls).
#[test]
fn invoking_a_stashed_continuation_later_resumes_its_original_context() {
    let mut rt = new_rt();
    let mut vm = Vm::new(&mut rt).unwrap();

    let plus = register_plus(&mut rt, &mut vm);
    let plus_sym = rt.intern("+");
    rt.define_global(plus_sym, plus);
    let k_sym = rt.intern("k");

    // (lambda (c) (set! k c) 10):
    //   0: args 1
    //   1: lvar 0 0   ; c
    //   2: gset k
    //   3: pop        ; gset peeks, doesn't consume; discard c explicitly
    //   4: const 10
    //   5: return
    let one = assemble::fixnum(&mut rt, 1).unwrap();
    let l0 = assemble::make_instr(&mut rt, Opcode::Args, one, ObjectRef::Nil).unwrap();
    let d0 = assemble::fixnum(&mut rt, 0).unwrap();
    let ix0 = assemble::fixnum(&mut rt, 0).unwrap();
    let l1 = assemble::make_instr(&mut rt, Opcode::Lvar, d0, ix0).unwrap();
    let k_sym_obj = rt.alloc_symbol("k").unwrap();
    let l2 = assemble::make_instr(&mut rt, Opcode::Gset, k_sym_obj, ObjectRef::Nil).unwrap();
    let l3 = assemble::make_instr(&mut rt, Opcode::Pop, ObjectRef::Nil, ObjectRef::Nil).unwrap();
    let ten = assemble::fixnum(&mut rt, 10).unwrap();
    let l4 = assemble::make_instr(&mut rt, Opcode::Const, ten, ObjectRef::Nil).unwrap();
    let l5 = assemble::make_instr(&mut rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil).unwrap();
    let lambda_bytecode = assemble::make_bytecode(&mut rt, &[l0, l1, l2, l3, l4, l5]).unwrap();
    let lambda = rt.alloc_compiled_proc(lambda_bytecode, ObjectRef::Nil).unwrap();

    // (+ 1 (call/cc lambda)):
    //   0: const 1
    //   1: save 5    ; resume at `gvar +` once the call below returns normally
    //   2: cc
    //   3: const lambda
    //   4: fcallj 1
    //   5: gvar +
    //   6: callj 2
    let one_const = assemble::fixnum(&mut rt, 1).unwrap();
    let o0 = assemble::make_instr(&mut rt, Opcode::Const, one_const, ObjectRef::Nil).unwrap();
    let resume_at = assemble::fixnum(&mut rt, 5).unwrap();
    let o1 = assemble::make_instr(&mut rt, Opcode::Save, resume_at, ObjectRef::Nil).unwrap();
    let o2 = assemble::make_instr(&mut rt, Opcode::Cc, ObjectRef::Nil, ObjectRef::Nil).unwrap();
    let o3 = assemble::make_instr(&mut rt, Opcode::Const, lambda, ObjectRef::Nil).unwrap();
    let one_arg = assemble::fixnum(&mut rt, 1).unwrap();
    let o4 = assemble::make_instr(&mut rt, Opcode::Fcallj, one_arg, ObjectRef::Nil).unwrap();
    let plus_sym_obj = rt.alloc_symbol("+").unwrap();
    let o5 = assemble::make_instr(&mut rt, Opcode::Gvar, plus_sym_obj, ObjectRef::Nil).unwrap();
    let two_args = assemble::fixnum(&mut rt, 2).unwrap();
    let o6 = assemble::make_instr(&mut rt, Opcode::Callj, two_args, ObjectRef::Nil).unwrap();
    let outer_bytecode = assemble::make_bytecode(&mut rt, &[o0, o1, o2, o3, o4, o5, o6]).unwrap();
    let outer = rt.alloc_compiled_proc(outer_bytecode, ObjectRef::Nil).unwrap();

    let first = call(&mut rt, &mut vm, outer, &[]).unwrap();
    assert_eq!(rt.fixnum_value(first), Some(11));

    let k = rt.lookup_global(k_sym).expect("set! stashed the continuation globally");
    let hundred = rt.alloc_fixnum(100).unwrap();
    let second = call(&mut rt, &mut vm, k, &[hundred]).unwrap();
    assert_eq!(rt.fixnum_value(second), Some(101));
}
