// src/sync/merge.rs
//! Pure merge-and-resort step shared by polling and pagination.

use std::collections::HashSet;

use crate::model::Event;

/// Which end of the held collection a batch extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEnd {
    /// Newer records from a poll: prepended.
    Front,
    /// Older records from pagination: appended.
    Back,
}

/// Merge `fetched` into `held`, dropping ids already held (and repeats within
/// the batch itself), then restore newest-first order.
///
/// Returns `None` when the batch adds nothing, so callers can keep the
/// existing snapshot untouched.
pub fn merge_batch(held: &[Event], fetched: Vec<Event>, end: MergeEnd) -> Option<Vec<Event>> {
    let mut seen: HashSet<i64> = held.iter().map(|e| e.id).collect();
    let fresh: Vec<Event> = fetched
        .into_iter()
        .filter(|e| seen.insert(e.id))
        .collect();

    if fresh.is_empty() {
        return None;
    }

    let mut merged = Vec::with_capacity(held.len() + fresh.len());
    match end {
        MergeEnd::Front => {
            merged.extend(fresh);
            merged.extend_from_slice(held);
        }
        MergeEnd::Back => {
            merged.extend_from_slice(held);
            merged.extend(fresh);
        }
    }
    sort_newest_first(&mut merged);
    Some(merged)
}

pub fn sort_newest_first(events: &mut [Event]) {
    events.sort_by(|a, b| b.id.cmp(&a.id));
}

/// True when ids are unique and strictly decreasing.
pub fn is_canonical(events: &[Event]) -> bool {
    events.windows(2).all(|w| w[0].id > w[1].id)
}
