//! The collection algorithm, wired up from the pieces in `heap`,
//! `roots`, and `finalize`. Mirrors `baker_collect` plus the
//! collect-then-maybe-extend heuristic in `alloc_object`:
//!
//! 1. Merge `old` back into `active` — last cycle's survivors rejoin the
//!    pool being re-examined.
//! 2. Bump the color epoch and mark everything reachable from the root
//!    stack, relocating it into `old`.
//! 3. Sweep the finalizable stacks: anything left behind in `active` and
//!    registered for finalization gets its out-of-slab resource dropped.
//! 4. Bump the color epoch again, so cells about to be recycled or
//!    freshly allocated by a following `extend` don't share a color with
//!    this cycle's proven-live survivors.
//! 5. Whatever remains in `active` is garbage; rewind the bump pointer
//!    to walk it from the front.

use crate::config::GcConfig;
use crate::error::GcError;
use crate::finalize::FinalizerStacks;
use crate::heap::Heap;
use crate::logging::{emit, GcEvent};
use crate::object::ObjectRef;

pub(crate) struct Collector {
    pub color: u8,
    pub next_extension: usize,
}

impl Collector {
    pub fn new(config: &GcConfig) -> Self {
        Collector {
            color: 0,
            next_extension: config.initial_heap_cells,
        }
    }

    /// Run one collection cycle. Returns the number of cells left free
    /// in `active` afterward.
    pub fn collect(
        &mut self,
        heap: &mut Heap,
        roots: impl Iterator<Item = ObjectRef>,
        finalizer: &mut FinalizerStacks,
    ) -> usize {
        let live_before = heap.live_count() - heap.free_count();
        emit(GcEvent::CycleStart { live_before });

        heap.merge_old_into_active();

        self.color = self.color.wrapping_add(1);
        heap.mark_and_trace(roots, self.color);

        let finalized = finalizer.sweep(heap.cells_mut(), self.color);
        for _ in 0..finalized {
            emit(GcEvent::Finalized);
        }

        self.color = self.color.wrapping_add(1);

        heap.reset_free_pointer();
        let freed = heap.free_count();

        emit(GcEvent::CycleEnd {
            freed,
            live_after: heap.live_count() - freed,
        });

        freed
    }

    /// Ensure at least one free cell is available, collecting and, if
    /// that didn't free enough, extending the heap. Matches
    /// `alloc_object`'s heuristic: extend when the last cycle freed
    /// nothing, or when freeing little relative to the planned extension
    /// size means another burst of allocation would immediately force a
    /// second collection.
    pub fn ensure_free_cell(
        &mut self,
        heap: &mut Heap,
        roots: impl Iterator<Item = ObjectRef>,
        finalizer: &mut FinalizerStacks,
        config: &GcConfig,
    ) -> Result<(), GcError> {
        if heap.free_count() > 0 {
            return Ok(());
        }

        let freed = self.collect(heap, roots, finalizer);

        let should_extend = freed == 0 || self.next_extension / freed > config.extension_trigger_ratio;
        if should_extend {
            let extension = self.next_extension;
            heap.extend(extension, self.color);
            emit(GcEvent::HeapExtended {
                added_cells: extension,
                total_cells: heap.live_count(),
            });
            self.next_extension *= config.heap_extension_growth;
        }

        if heap.free_count() == 0 {
            return Err(GcError::HeapExhausted {
                live: heap.live_count(),
                attempted: self.next_extension,
            });
        }

        Ok(())
    }
}
