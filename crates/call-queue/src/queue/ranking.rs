//! Deterministic call order, independent of how the entries were stored or fetched.

use std::cmp::Ordering;

use super::domain::CallListEntry;

/// Orders by list type rank, then priority rank, then creation time (oldest first).
///
/// Entries identical on all three keys fall back to their ledger id so the order is
/// total regardless of snapshot iteration order. Callback state is not
/// a key.
pub fn compare(a: &CallListEntry, b: &CallListEntry) -> Ordering {
    a.list_type
        .rank()
        .cmp(&b.list_type.rank())
        .then_with(|| a.priority.rank().cmp(&b.priority.rank()))
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort one snapshot of active entries into call order.
pub fn rank(mut entries: Vec<CallListEntry>) -> Vec<CallListEntry> {
    entries.sort_by(compare);
    entries
}
