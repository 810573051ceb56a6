//! Partitioning a batch into the concurrent wave and the sequential tail.

use switchyard_registry::RegisteredHandler;

/// Batch indices of the handlers a sequential handler must wait for.
///
/// A key equal to another member's id resolves to that member only. A key
/// equal to a category label resolves to every member of that category
/// except the handler itself and sequential handlers registered after it
/// (those are ordered behind it anyway). A key resolving to nothing names
/// an earlier stage and is already satisfied.
pub(crate) fn dependencies(batch: &[RegisteredHandler], at: usize, key: &str) -> Vec<usize> {
    let me = &batch[at];
    if let Some(by_id) = batch
        .iter()
        .position(|h| h.id().as_str() == key && h.position() != me.position())
    {
        return vec![by_id];
    }
    batch
        .iter()
        .enumerate()
        .filter(|(i, h)| {
            *i != at
                && h.spec().category.label() == key
                && (h.spec().concurrency.is_independent() || h.position() < me.position())
        })
        .map(|(i, _)| i)
        .collect()
}

/// Split a batch (already in registration order) into independent and
/// sequential indices.
pub(crate) fn partition(batch: &[RegisteredHandler]) -> (Vec<usize>, Vec<usize>) {
    (0..batch.len()).partition(|&i| batch[i].spec().concurrency.is_independent())
}
