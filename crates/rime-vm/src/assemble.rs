//! Hand-building bytecode, grounded on the original's `make_instr`. There
//! is no compiler in this workspace (out of scope, §3.2); callers that
//! want to run a program construct its bytecode with these helpers
//! directly, the same way the original's REPL or a test harness would
//! call `make_instr` before the compiler existed.

use rime_gc::{ObjectRef, Result as GcResult, RootGuard, Runtime};

use crate::error::Result;
use crate::opcode::Opcode;

/// `cons` of two already-pinned values, consuming both guards and
/// returning the result freshly pinned. The building block every
/// multi-cell allocation below is made of, so that no intermediate pair
/// is ever left unreachable across a later allocation that might collect.
fn cons_pinned(rt: &mut Runtime, car: RootGuard, cdr: RootGuard) -> GcResult<RootGuard> {
    let pair = rt.alloc_pair(rt.root(car), rt.root(cdr))?;
    rt.unpin(car)?;
    rt.unpin(cdr)?;
    Ok(rt.pin(pair))
}

/// Build one instruction: the list `(opcode-char arg1 arg2)`. `arg1`/
/// `arg2` are `ObjectRef::Nil` when the opcode takes fewer operands.
pub fn make_instr(rt: &mut Runtime, op: Opcode, arg1: ObjectRef, arg2: ObjectRef) -> Result<ObjectRef> {
    let arg1 = rt.pin(arg1);
    let arg2 = rt.pin(arg2);
    let nil = rt.pin(ObjectRef::Nil);

    let opcode_char = rt.alloc_character(op.as_u8())?;
    let opcode = rt.pin(opcode_char);

    let rest = cons_pinned(rt, arg2, nil)?;
    let rest = cons_pinned(rt, arg1, rest)?;
    let whole = cons_pinned(rt, opcode, rest)?;

    let result = rt.root(whole);
    rt.unpin(whole)?;
    Ok(result)
}

/// Build a fixnum operand. Convenience wrapper so call sites read as
/// `fixnum(rt, 3)` rather than reaching into `rime_gc` directly.
pub fn fixnum(rt: &mut Runtime, value: i64) -> GcResult<ObjectRef> {
    rt.alloc_fixnum(value)
}

/// Build a bytecode vector (a procedure's compiled body) from a sequence
/// of already-built instructions.
pub fn make_bytecode(rt: &mut Runtime, instrs: &[ObjectRef]) -> Result<ObjectRef> {
    let bytecode = rt.alloc_vector(instrs.len(), ObjectRef::Nil)?;
    let guard = rt.pin(bytecode);
    for (i, instr) in instrs.iter().enumerate() {
        rt.vector_set(rt.root(guard), i, *instr)?;
    }
    let result = rt.root(guard);
    rt.unpin(guard)?;
    Ok(result)
}

/// An instruction built with a single fixnum operand, pinning it across
/// the fixnum allocation so the two never race a collection.
fn lvar_instr(rt: &mut Runtime, depth: i64, index: i64) -> Result<ObjectRef> {
    let depth_obj = fixnum(rt, depth)?;
    let depth_guard = rt.pin(depth_obj);
    let index_obj = fixnum(rt, index)?;
    let instr = make_instr(rt, Opcode::Lvar, rt.root(depth_guard), index_obj)?;
    rt.unpin(depth_guard)?;
    Ok(instr)
}

/// The fixed six-instruction program every reified continuation runs as
/// its body (§4.4.1): accept one value, reinstate the captured stack,
/// push the value back, return it.
pub fn cc_bytecode(rt: &mut Runtime) -> Result<ObjectRef> {
    let one = fixnum(rt, 1)?;
    let instr0 = make_instr(rt, Opcode::Args, one, ObjectRef::Nil)?;
    let instr0 = rt.pin(instr0);

    let instr1 = lvar_instr(rt, 1, 1)?; // captured stack-top
    let instr1 = rt.pin(instr1);

    let instr2 = lvar_instr(rt, 1, 0)?; // captured stack
    let instr2 = rt.pin(instr2);

    let instr3 = make_instr(rt, Opcode::Setcc, ObjectRef::Nil, ObjectRef::Nil)?;
    let instr3 = rt.pin(instr3);

    let instr4 = lvar_instr(rt, 0, 0)?; // the return value
    let instr4 = rt.pin(instr4);

    let instr5 = make_instr(rt, Opcode::Return, ObjectRef::Nil, ObjectRef::Nil)?;

    let instrs = [
        rt.root(instr0),
        rt.root(instr1),
        rt.root(instr2),
        rt.root(instr3),
        rt.root(instr4),
        instr5,
    ];
    let bytecode = make_bytecode(rt, &instrs)?;

    rt.unpin(instr4)?;
    rt.unpin(instr3)?;
    rt.unpin(instr2)?;
    rt.unpin(instr1)?;
    rt.unpin(instr0)?;
    Ok(bytecode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rime_gc::GcConfig;

    #[test]
    fn make_instr_decodes_back_to_its_opcode_and_operands() {
        let mut rt = Runtime::new(GcConfig::default()).unwrap();
        let arg = fixnum(&mut rt, 7).unwrap();
        let instr = make_instr(&mut rt, Opcode::Jump, arg, ObjectRef::Nil).unwrap();

        assert_eq!(crate::instr::opcode(&rt, instr).unwrap(), Opcode::Jump);
        assert_eq!(rt.fixnum_value(crate::instr::arg1(&rt, instr).unwrap()), Some(7));
    }

    #[test]
    fn cc_bytecode_has_six_instructions_in_the_documented_order() {
        let mut rt = Runtime::new(GcConfig::default()).unwrap();
        let bc = cc_bytecode(&mut rt).unwrap();
        assert_eq!(rt.vector_len(bc).unwrap(), 6);
        let expected = [
            Opcode::Args,
            Opcode::Lvar,
            Opcode::Lvar,
            Opcode::Setcc,
            Opcode::Lvar,
            Opcode::Return,
        ];
        for (i, op) in expected.iter().enumerate() {
            let instr = rt.vector_get(bc, i).unwrap();
            assert_eq!(crate::instr::opcode(&rt, instr).unwrap(), *op);
        }
    }

    #[test]
    fn heavy_allocation_pressure_while_assembling_does_not_corrupt_instructions() {
        // forces collections mid-assembly: every intermediate cons in
        // make_instr/make_bytecode must stay reachable through the
        // construction, not just at the end.
        let cfg = GcConfig {
            initial_heap_cells: 8,
            heap_extension_growth: 2,
            extension_trigger_ratio: 1,
            ..GcConfig::default()
        };
        let mut rt = Runtime::new(cfg).unwrap();
        let bc = cc_bytecode(&mut rt).unwrap();
        assert_eq!(rt.vector_len(bc).unwrap(), 6);
        let instr1 = rt.vector_get(bc, 1).unwrap();
        assert_eq!(
            rt.fixnum_value(crate::instr::arg2(&rt, instr1).unwrap()),
            Some(1)
        );
    }
}
