//! Operator-driven status transitions for call list entries.
//!
//! Every action is planned into an [`EntryMutation`] up front; the ledger then applies
//! that mutation only if the stored entry is still active. A mutation that finds the
//! entry already retired reports [`MutationOutcome::NoOpStale`] instead of failing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{AgentId, CallListEntry, EntryStatus, Priority};

const DEFAULT_REMOVAL_REASON: &str = "Manual removal";

/// Result of a conditional write against the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    Applied,
    NoOpStale,
}

impl MutationOutcome {
    pub const fn is_applied(self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }
}

/// Validated operator intent, before it is reduced to a concrete mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorAction {
    AddNote {
        text: String,
        callback_at: Option<DateTime<Utc>>,
        remove: bool,
    },
    ScheduleCallback {
        callback_at: DateTime<Utc>,
        priority: Priority,
    },
    Remove {
        reason: String,
    },
    AssignAgent {
        agent_id: AgentId,
    },
}

/// Concrete field changes applied to an active entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMutation {
    /// Contact made, nothing further scheduled.
    RecordContact { notes: String },
    /// Contact made and a follow-up booked; the entry returns to the pending pool.
    RecordContactWithCallback {
        notes: String,
        callback_at: DateTime<Utc>,
    },
    /// Note closes out the obligation. Attempts are not counted.
    Complete { notes: String },
    Reschedule {
        callback_at: DateTime<Utc>,
        priority: Priority,
    },
    Remove { reason: String },
    Assign { agent_id: AgentId },
}

impl EntryMutation {
    /// Reduce an operator action to the mutation the transition table prescribes.
    pub fn plan(action: OperatorAction) -> Self {
        match action {
            OperatorAction::AddNote {
                text, remove: true, ..
            } => EntryMutation::Complete { notes: text },
            OperatorAction::AddNote {
                text,
                callback_at: Some(callback_at),
                remove: false,
            } => EntryMutation::RecordContactWithCallback {
                notes: text,
                callback_at,
            },
            OperatorAction::AddNote {
                text,
                callback_at: None,
                remove: false,
            } => EntryMutation::RecordContact { notes: text },
            OperatorAction::ScheduleCallback {
                callback_at,
                priority,
            } => EntryMutation::Reschedule {
                callback_at,
                priority,
            },
            OperatorAction::Remove { reason } => {
                let reason = reason.trim();
                let reason = if reason.is_empty() {
                    DEFAULT_REMOVAL_REASON.to_string()
                } else {
                    reason.to_string()
                };
                EntryMutation::Remove { reason }
            }
            OperatorAction::AssignAgent { agent_id } => EntryMutation::Assign { agent_id },
        }
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            EntryMutation::RecordContact { .. } => "record_contact",
            EntryMutation::RecordContactWithCallback { .. } => "record_contact_with_callback",
            EntryMutation::Complete { .. } => "complete",
            EntryMutation::Reschedule { .. } => "reschedule",
            EntryMutation::Remove { .. } => "remove",
            EntryMutation::Assign { .. } => "assign",
        }
    }

    /// Apply the mutation in place. Non-active entries are left untouched.
    pub fn apply(&self, entry: &mut CallListEntry, at: DateTime<Utc>) -> MutationOutcome {
        if !entry.is_active() {
            return MutationOutcome::NoOpStale;
        }

        match self {
            EntryMutation::RecordContact { notes } => {
                entry.status = EntryStatus::Contacted;
                entry.call_attempts = entry.call_attempts.saturating_add(1);
                entry.callback_at = None;
                entry.notes = Some(notes.clone());
            }
            EntryMutation::RecordContactWithCallback { notes, callback_at } => {
                entry.status = EntryStatus::Pending;
                entry.call_attempts = entry.call_attempts.saturating_add(1);
                entry.callback_at = Some(*callback_at);
                entry.notes = Some(notes.clone());
            }
            EntryMutation::Complete { notes } => {
                entry.status = EntryStatus::Completed;
                entry.callback_at = None;
                entry.notes = Some(notes.clone());
            }
            EntryMutation::Reschedule {
                callback_at,
                priority,
            } => {
                entry.status = EntryStatus::Pending;
                entry.callback_at = Some(*callback_at);
                entry.priority = *priority;
            }
            EntryMutation::Remove { reason } => {
                entry.status = EntryStatus::Removed;
                entry.notes = Some(reason.clone());
            }
            EntryMutation::Assign { agent_id } => {
                entry.assigned_agent = Some(*agent_id);
            }
        }

        entry.updated_at = at;
        MutationOutcome::Applied
    }
}
