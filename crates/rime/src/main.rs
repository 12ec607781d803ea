//! rime - command-line driver for the bytecode VM and its collector.
//!
//! There is no source-level compiler in this workspace (out of scope,
//! §3.2 of the design docs), so this binary doesn't read Scheme source;
//! it assembles and runs a small fixed set of demo programs covering
//! the VM laws and end-to-end scenarios the core is built against.

mod commands;
mod error;
mod programs;

use clap::{Parser, Subcommand};

use commands::{run_disasm, run_run, DisasmArgs, RunArgs};
use programs::ProgramName;

/// rime - a bytecode VM and tracing collector for a small Scheme
#[derive(Parser, Debug)]
#[command(name = "rime")]
#[command(author = "Rime Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run and inspect the rime bytecode VM's demo programs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug-level) logging
    #[arg(short, long, global = true, env = "RIME_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Assemble and execute a built-in demo program
    Run(RunCommand),
    /// Assemble a built-in demo program and print its bytecode
    Disasm(DisasmCommand),
}

#[derive(Parser, Debug)]
struct RunCommand {
    /// Which demo program to run
    program: ProgramName,

    /// Starting value for `tail-loop`'s countdown
    #[arg(long, default_value_t = 50_000)]
    iterations: i64,

    /// Override the collector's initial heap size, in cells
    #[arg(long)]
    initial_heap_cells: Option<usize>,
}

#[derive(Parser, Debug)]
struct DisasmCommand {
    /// Which demo program to disassemble
    program: ProgramName,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run(cmd) => run_run(RunArgs {
            program: cmd.program,
            iterations: cmd.iterations,
            initial_heap_cells: cmd.initial_heap_cells,
        }),
        Commands::Disasm(cmd) => run_disasm(DisasmArgs { program: cmd.program }),
    };

    if let Err(err) = result {
        log::error!("{err}");
        std::process::exit(exit_code(&err));
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn exit_code(err: &error::RimeError) -> i32 {
    debug_assert!(err.is_fatal(), "§7 currently has no recoverable core error");
    err.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_run_with_program_and_defaults() {
        let cli = Cli::parse_from(["rime", "run", "plus"]);
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.program, ProgramName::Plus);
                assert_eq!(cmd.iterations, 50_000);
                assert_eq!(cmd.initial_heap_cells, None);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parses_run_with_overrides() {
        let cli = Cli::parse_from(["rime", "run", "tail-loop", "--iterations", "10", "--initial-heap-cells", "64"]);
        match cli.command {
            Commands::Run(cmd) => {
                assert_eq!(cmd.program, ProgramName::TailLoop);
                assert_eq!(cmd.iterations, 10);
                assert_eq!(cmd.initial_heap_cells, Some(64));
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parses_disasm() {
        let cli = Cli::parse_from(["rime", "disasm", "call-cc"]);
        match cli.command {
            Commands::Disasm(cmd) => assert_eq!(cmd.program, ProgramName::CallCc),
            _ => panic!("expected Disasm command"),
        }
    }

    #[test]
    fn parses_global_verbose() {
        let cli = Cli::parse_from(["rime", "--verbose", "run", "identity"]);
        assert!(cli.verbose);
    }
}
