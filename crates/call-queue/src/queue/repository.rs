use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{
    Agent, CallListEntry, CallNote, NewCallListEntry, NewCallNote, SubjectId, SubjectProfile,
};
use super::workflow::{EntryMutation, MutationOutcome};

/// Whether intake created a new entry or refreshed the subject's existing active one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "entry", rename_all = "snake_case")]
pub enum EnqueueOutcome {
    Created(CallListEntry),
    Refreshed(CallListEntry),
}

impl EnqueueOutcome {
    pub fn entry(&self) -> &CallListEntry {
        match self {
            EnqueueOutcome::Created(entry) | EnqueueOutcome::Refreshed(entry) => entry,
        }
    }
}

/// Durable store of call list entries, keyed by subject.
///
/// At most one entry per subject may be active at a time; implementations enforce
/// this rather than relying on callers. Every write is a conditional update against
/// the active guard so concurrent operators never need locks.
pub trait CallListLedger: Send + Sync {
    fn enqueue(
        &self,
        entry: NewCallListEntry,
        at: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, StoreError>;
    fn fetch_active(&self, subject: SubjectId) -> Result<Option<CallListEntry>, StoreError>;
    /// Every entry ever recorded for the subject, oldest first.
    fn entries_for(&self, subject: SubjectId) -> Result<Vec<CallListEntry>, StoreError>;
    fn apply_if_active(
        &self,
        subject: SubjectId,
        mutation: &EntryMutation,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError>;
    /// One consistent read of all active entries, in no particular order.
    fn active_snapshot(&self) -> Result<Vec<CallListEntry>, StoreError>;
    /// Delete retired entries last touched before `cutoff`, returning how many went.
    fn purge_retired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError>;
}

/// Append-only memo ledger shared with the rest of the back office.
pub trait MemoLedger: Send + Sync {
    fn append(&self, note: NewCallNote, at: DateTime<Utc>) -> Result<CallNote, StoreError>;
    fn notes_for(&self, subject: SubjectId) -> Result<Vec<CallNote>, StoreError>;
}

/// Read-only join against the applicant/client directory.
pub trait SubjectDirectory: Send + Sync {
    fn subjects(
        &self,
        ids: &[SubjectId],
    ) -> Result<HashMap<SubjectId, SubjectProfile>, StoreError>;
}

/// Read-only view of operator accounts allowed to work the queue.
pub trait AgentDirectory: Send + Sync {
    fn call_agents(&self) -> Result<Vec<Agent>, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("subject already has an active call list entry")]
    Conflict,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("stored record is unreadable: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
