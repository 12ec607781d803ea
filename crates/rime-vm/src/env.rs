//! Environment chain helpers. An environment is a proper list of frames
//! (§3.2): each `cons` cell's `car` is a frame VECTOR, its `cdr` the
//! enclosing environment. `lvar`/`lset` address a variable as
//! `(depth, index)` — walk `cdr` `depth` times, then index into that
//! frame's vector.

use rime_gc::{ObjectRef, Runtime};

use crate::error::Result;

/// The frame vector `depth` links up the chain from `env`.
pub fn frame_at(rt: &Runtime, env: ObjectRef, depth: i64) -> Result<ObjectRef> {
    let mut cursor = env;
    for _ in 0..depth {
        cursor = rt.cdr(cursor)?;
    }
    Ok(rt.car(cursor)?)
}
