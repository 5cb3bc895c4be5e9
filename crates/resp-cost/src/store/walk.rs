use crate::{Result, Store};
use std::collections::HashSet;

/// Iterates the key space with `SCAN` and returns the number of distinct keys
/// seen.
///
/// The walk starts at cursor `0` and stops when the store hands back cursor
/// `0`. `SCAN` may return a key more than once, so keys are de-duplicated.
/// `batch` is the `COUNT` hint passed on every call.
#[cfg_attr(feature = "tracing", tracing::instrument(skip(store)))]
pub async fn walk_keys<S: Store>(store: &S, pattern: &str, batch: usize) -> Result<usize> {
    let mut seen = HashSet::new();
    let mut cursor = 0;
    #[cfg(feature = "tracing")]
    let mut calls = 0_usize;

    loop {
        let (keys, next) = store.scan(cursor, pattern, batch).await?;
        #[cfg(feature = "tracing")]
        {
            calls += 1;
        }
        seen.extend(keys);
        if next == 0 {
            break;
        }
        cursor = next;
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(keys = seen.len(), calls, "Key space walk complete");

    Ok(seen.len())
}
