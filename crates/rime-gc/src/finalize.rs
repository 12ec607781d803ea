//! The two finalizable-object stacks.
//!
//! Every cell allocated with `needs_finalization` is pushed onto
//! `current`. During a cycle, anything still in `current` that the mark
//! phase did *not* relocate into `old` is dead and gets its out-of-slab
//! resource dropped; anything that survived is carried forward into
//! `next`. The stacks are then swapped and `next` cleared, exactly the
//! `Finalizable_Objects`/`Finalizable_Objects_Next` dance in the
//! original — a cell only ever needs checking once per cycle, not once
//! per reference to it.

use crate::object::{Cell, CellId, Payload};

pub(crate) struct FinalizerStacks {
    current: Vec<CellId>,
    next: Vec<CellId>,
}

impl FinalizerStacks {
    pub fn with_capacity(capacity: usize) -> Self {
        FinalizerStacks {
            current: Vec::with_capacity(capacity),
            next: Vec::with_capacity(capacity),
        }
    }

    pub fn register(&mut self, id: CellId) {
        self.current.push(id);
    }

    /// Sweep `current`: finalize every cell whose color doesn't match
    /// `live_color` (the mark color this cycle relocated survivors to),
    /// carry the rest into `next`, then swap. Returns how many cells were
    /// finalized, for logging.
    pub fn sweep(&mut self, cells: &mut [Cell], live_color: u8) -> usize {
        let mut finalized = 0;
        for id in self.current.drain(..) {
            if cells[id.index()].color != live_color {
                finalize_object(&mut cells[id.index()]);
                finalized += 1;
            } else {
                self.next.push(id);
            }
        }
        std::mem::swap(&mut self.current, &mut self.next);
        self.next.clear();
        finalized
    }
}

/// Drop the out-of-slab resource a `Str`/`Vector`/`HashTable` cell owns,
/// by overwriting its payload. The cell itself stays in the arena for
/// `alloc` to reuse.
pub(crate) fn finalize_object(cell: &mut Cell) {
    match cell.payload {
        Payload::Str(_) | Payload::Vector(_) | Payload::HashTable(_) => {
            cell.payload = Payload::Tombstone;
        }
        _ => {}
    }
}
