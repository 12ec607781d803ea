//! Subcommand implementations for the `rime` CLI.

pub mod disasm;
pub mod run;

pub use disasm::{run_disasm, DisasmArgs};
pub use run::{run_run, RunArgs};
