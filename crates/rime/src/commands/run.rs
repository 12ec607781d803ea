//! `rime run` - assemble and execute one of the built-in demo programs.

use log::info;
use rime_gc::{GcConfig, Runtime};
use rime_vm::{call, Vm};

use crate::error::Result;
use crate::programs::{self, ProgramName};

#[derive(Debug, Clone)]
pub struct RunArgs {
    pub program: ProgramName,
    pub iterations: i64,
    pub initial_heap_cells: Option<usize>,
}

pub fn run_run(args: RunArgs) -> Result<()> {
    let mut gc_config = GcConfig::default();
    if let Some(cells) = args.initial_heap_cells {
        gc_config.initial_heap_cells = cells;
        gc_config
            .validate()
            .map_err(|e| crate::error::RimeError::Config(e.to_string()))?;
    }

    let mut rt = Runtime::new(gc_config)?;
    let mut vm = Vm::new(&mut rt)?;

    let (proc, call_args) = programs::build(&mut rt, &mut vm, args.program, args.iterations)?;
    info!("running {:?} with {} argument(s)", args.program, call_args.len());

    let result = call(&mut rt, &mut vm, proc, &call_args)?;
    match rt.fixnum_value(result) {
        Some(n) => println!("{n}"),
        None => println!("{result:?}"),
    }
    info!("heap: {} live cells", rt.live_count());
    Ok(())
}
