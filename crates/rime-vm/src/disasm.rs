//! Bytecode disassembly, grounded on the original's `wb()` debug dump.
//! Renders each instruction as `offset: (name arg1 arg2)` with operands
//! that are themselves heap values (constants, symbols, literal
//! sub-bytecode) shown via `Runtime`'s own `Debug` impl for `ObjectRef`
//! rather than a full Scheme printer, which this crate doesn't have.

use std::fmt::Write as _;

use rime_gc::{ObjectRef, Runtime};

use crate::error::Result;
use crate::instr;

pub fn disassemble(rt: &Runtime, bytecode: ObjectRef) -> Result<String> {
    let len = rt.vector_len(bytecode)?;
    let mut out = String::new();
    for pc in 0..len {
        let instr_cell = rt.vector_get(bytecode, pc)?;
        let op = instr::opcode(rt, instr_cell)?;
        let a1 = instr::arg1(rt, instr_cell)?;
        let a2 = instr::arg2(rt, instr_cell)?;
        let _ = writeln!(out, "{pc:4}: ({} {:?} {:?})", op.name(), a1, a2);
    }
    Ok(out)
}
