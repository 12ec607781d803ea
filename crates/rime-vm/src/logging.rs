//! Structured dispatch events, emitted through `log` the same way
//! `rime_gc::logging` reports collection cycles: nothing here is a
//! failure, just state transitions an operator watching the VM might
//! want to see.

use log::{debug, trace};

#[derive(Debug, Clone, Copy)]
pub enum VmEvent {
    /// Entering a compiled procedure's bytecode (`callj`/`fcallj` or the
    /// initial `execute` dispatch).
    ProcEntered { n_args: i64, tail_call: bool },
    /// A primitive ran inline without a bytecode jump.
    PrimitiveCalled { n_args: i64 },
    /// `cc` reified the live stack into a callable continuation.
    ContinuationCaptured { stack_depth: usize },
    /// `setcc` discarded the live stack and rebuilt it from a capture.
    ContinuationInvoked { stack_depth: usize },
}

pub fn emit(event: VmEvent) {
    match event {
        VmEvent::ProcEntered { n_args, tail_call } => {
            trace!("vm: enter proc, {n_args} args, tail_call={tail_call}");
        }
        VmEvent::PrimitiveCalled { n_args } => {
            trace!("vm: primitive call, {n_args} args");
        }
        VmEvent::ContinuationCaptured { stack_depth } => {
            debug!("vm: captured continuation, stack depth {stack_depth}");
        }
        VmEvent::ContinuationInvoked { stack_depth } => {
            debug!("vm: invoked continuation, restoring stack depth {stack_depth}");
        }
    }
}
