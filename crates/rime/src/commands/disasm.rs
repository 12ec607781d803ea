//! `rime disasm` - build one of the demo programs and print its
//! bytecode without running it.

use rime_gc::{GcConfig, Runtime};
use rime_vm::Vm;

use crate::error::Result;
use crate::programs::{self, ProgramName};

#[derive(Debug, Clone)]
pub struct DisasmArgs {
    pub program: ProgramName,
}

pub fn run_disasm(args: DisasmArgs) -> Result<()> {
    let mut rt = Runtime::new(GcConfig::default())?;
    let mut vm = Vm::new(&mut rt)?;

    let (proc, _call_args) = programs::build(&mut rt, &mut vm, args.program, 0)?;
    let (bytecode, _env) = rt.compiled_proc_fields(proc)?;
    let listing = rime_vm::disassemble(&rt, bytecode)?;
    print!("{listing}");
    Ok(())
}
