//! Instruction decoding. An instruction is the list `(opcode-char arg1
//! arg2)` — three cons cells, `OPCODE`/`ARG1`/`ARG2` in the original's
//! macros. No separate instruction struct is allocated in the slab; the
//! VM reads the opcode and operands straight out of the pair chain each
//! time it dispatches, exactly as `vm_execute`'s `switch(CHAR(opcode))`
//! does.

use rime_gc::{ObjectRef, Runtime};

use crate::error::{Result, VmError};
use crate::opcode::Opcode;

pub fn opcode(rt: &Runtime, instr: ObjectRef) -> Result<Opcode> {
    let tagged = rt.car(instr)?;
    let byte = rt.character_value(tagged).ok_or(VmError::BadOperand("opcode tag is not a character"))?;
    Opcode::from_u8(byte)
}

pub fn args(rt: &Runtime, instr: ObjectRef) -> Result<ObjectRef> {
    rt.cdr(instr).map_err(VmError::from)
}

pub fn arg1(rt: &Runtime, instr: ObjectRef) -> Result<ObjectRef> {
    rt.car(args(rt, instr)?).map_err(VmError::from)
}

pub fn arg2(rt: &Runtime, instr: ObjectRef) -> Result<ObjectRef> {
    rt.car(rt.cdr(args(rt, instr)?)?).map_err(VmError::from)
}

/// Read an operand expected to be a fixnum (jump targets, arg counts,
/// frame depths/indices).
pub fn arg_fixnum(rt: &Runtime, instr: ObjectRef, second: bool) -> Result<i64> {
    let obj = if second { arg2(rt, instr)? } else { arg1(rt, instr)? };
    rt.fixnum_value(obj).ok_or(VmError::BadOperand("expected a fixnum operand"))
}
