//! Shared early-return macros.
//!
//! `rime-gc` and `rime-vm` each define their own error enum (a `GcError`
//! and a `VmError`); these macros just keep `return Err(...)` sites terse,
//! the same role they play in the fgc crate this workspace is descended
//! from.

/// Return early with an error, converting via `Into`.
#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err(::std::convert::Into::into($err))
    };
}

/// Return early with an error unless `cond` holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !($cond) {
            return Err(::std::convert::Into::into($err));
        }
    };
}
