//! Structured collection-cycle events, emitted through `log` rather than
//! returned to the caller — a collection succeeding or the heap growing
//! are never failures, just things an operator watching the runtime might
//! want to see.

use log::{debug, info};

#[derive(Debug, Clone, Copy)]
pub enum GcEvent {
    /// A collection cycle is about to mark from roots.
    CycleStart { live_before: usize },
    /// A collection cycle finished; `freed` cells returned to the free list.
    CycleEnd { freed: usize, live_after: usize },
    /// The heap grew because the last cycle didn't free enough.
    HeapExtended { added_cells: usize, total_cells: usize },
    /// An object was finalized (its out-of-slab resource released) during
    /// a cycle.
    Finalized,
}

pub fn emit(event: GcEvent) {
    match event {
        GcEvent::CycleStart { live_before } => {
            debug!("gc: cycle start, {live_before} cells live");
        }
        GcEvent::CycleEnd { freed, live_after } => {
            info!("gc: cycle end, freed {freed} cells, {live_after} now live");
        }
        GcEvent::HeapExtended {
            added_cells,
            total_cells,
        } => {
            info!("gc: heap extended by {added_cells} cells, {total_cells} total");
        }
        GcEvent::Finalized => {
            debug!("gc: finalized an object");
        }
    }
}
