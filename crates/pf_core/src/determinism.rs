//! Determinism utilities: first-minimum selection in input order.
//!
//! Selections never go through a sort. The scan keeps the earliest candidate
//! on equal keys, so ties resolve to input order regardless of sort stability.

use core::cmp::Ordering;

/// Index and key of the first minimum of `keys` (strict `<` scan).
///
/// Returns `Ok(None)` for an empty iterator and propagates the first `Err`.
/// Keys unordered with themselves (NaN) lose to any ordered key, wherever they
/// appear; only when every key is unordered is the first one returned.
pub fn first_min_by_key<K, E, I>(keys: I) -> Result<Option<(usize, K)>, E>
where
    K: PartialOrd,
    I: IntoIterator<Item = Result<K, E>>,
{
    fn unordered<T: PartialOrd>(k: &T) -> bool {
        k.partial_cmp(k).is_none()
    }

    let mut best: Option<(usize, K)> = None;
    for (i, key) in keys.into_iter().enumerate() {
        let key = key?;
        let replace = match &best {
            None => true,
            Some((_, b)) if unordered(b) => !unordered(&key),
            Some((_, b)) => key.partial_cmp(b) == Some(Ordering::Less),
        };
        if replace {
            best = Some((i, key));
        }
    }
    Ok(best)
}

/* ---------------------------------- Tests --------------------------------- */
