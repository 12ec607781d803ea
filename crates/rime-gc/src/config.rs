//! Collector tuning parameters.
//!
//! The original collector hardcoded all of these (`extend_heap(1000)` at
//! startup, a fixed `*3` growth factor, a fixed `2x` extension-trigger
//! ratio). Pulling them into a config struct follows `fgc::GcConfig`'s
//! lead without adopting its generational/region machinery, none of
//! which this single-generation collector has a use for.

#[derive(Debug, Clone)]
pub struct GcConfig {
    /// Cells allocated by the first `extend_heap` call, at `Runtime::new`.
    ///
    /// Default: 1000, matching the original's `gc_init`.
    pub initial_heap_cells: usize,

    /// Multiplier applied to the extension size every time the heap grows.
    ///
    /// Default: 3, matching the original's `Next_Heap_Extension *= 3`.
    pub heap_extension_growth: usize,

    /// A collection extends the heap when `freed == 0` or when
    /// `next_extension / freed > extension_trigger_ratio`, i.e. when the
    /// last cycle reclaimed little enough that another allocation burst
    /// would immediately trigger a second collection.
    ///
    /// Default: 2, matching the original's `Next_Heap_Extension > free_count * 2`.
    pub extension_trigger_ratio: usize,

    /// Initial capacity reserved for the root stack.
    ///
    /// Default: 400, matching the original's `push_root`/`pop_root` stack.
    pub root_stack_initial_capacity: usize,

    /// Initial capacity reserved for each of the two finalizable-object
    /// stacks.
    ///
    /// Default: 400, matching the original's finalizable-object stack.
    pub finalizable_initial_capacity: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        GcConfig {
            initial_heap_cells: 1000,
            heap_extension_growth: 3,
            extension_trigger_ratio: 2,
            root_stack_initial_capacity: 400,
            finalizable_initial_capacity: 400,
        }
    }
}

impl GcConfig {
    pub fn validate(&self) -> Result<(), crate::error::GcError> {
        if self.initial_heap_cells == 0 {
            return Err(crate::error::GcError::Configuration(
                "initial_heap_cells must be > 0".to_string(),
            ));
        }
        if self.heap_extension_growth < 2 {
            return Err(crate::error::GcError::Configuration(
                "heap_extension_growth must be >= 2 or the heap stops growing".to_string(),
            ));
        }
        if self.extension_trigger_ratio == 0 {
            return Err(crate::error::GcError::Configuration(
                "extension_trigger_ratio must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}
