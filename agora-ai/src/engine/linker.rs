//! Check-then-create helper for derived entities
//!
//! Both "exactly one" invariants (issue per source item, vote proposal per
//! issue) are the same pattern: look up the existing entity, create only when
//! absent. The lookup and create are not one atomic step; the stores back the
//! issue side with a unique index so a concurrent duplicate fails safely.

use std::future::Future;

use crate::error::Result;

/// Return the existing entity, or create it exactly once
///
/// The boolean is true when `create` ran.
pub async fn ensure_once<T, L, C, LFut, CFut>(lookup: L, create: C) -> Result<(T, bool)>
where
    L: FnOnce() -> LFut,
    C: FnOnce() -> CFut,
    LFut: Future<Output = Result<Option<T>>>,
    CFut: Future<Output = Result<T>>,
{
    if let Some(existing) = lookup().await? {
        return Ok((existing, false));
    }

    let created = create().await?;
    Ok((created, true))
}
