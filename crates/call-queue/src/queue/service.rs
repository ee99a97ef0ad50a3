use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::callback::{CallbackClock, Clock, SystemClock};
use super::domain::{
    ActorId, AgentId, CallListEntry, CallNote, NewCallListEntry, NewCallNote, Priority, SubjectId,
};
use super::query::{self, QueueFilter, QueueSummary, QueueView};
use super::repository::{
    AgentDirectory, CallListLedger, EnqueueOutcome, MemoLedger, StoreError, SubjectDirectory,
};
use super::workflow::{EntryMutation, MutationOutcome, OperatorAction};

/// Payload of the "add call note" action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNoteRequest {
    pub note: String,
    #[serde(default)]
    pub callback_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub remove_from_list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleCallbackRequest {
    #[serde(default)]
    pub callback_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub priority: Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignAgentRequest {
    pub agent_id: AgentId,
}

/// Full contact history for one subject, including retired entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectHistory {
    pub subject_id: SubjectId,
    pub entries: Vec<CallListEntry>,
    pub notes: Vec<CallNote>,
}

/// Input rejected before any write. The message is shown to the operator verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Note is required")]
    EmptyNote,
    #[error("Callback date is required")]
    MissingCallback,
    #[error("Agent {0} is not authorized to handle calls")]
    UnknownAgent(AgentId),
    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,
    #[error("Operator identity is required")]
    MissingActor,
    #[error("Unknown {field} filter '{value}'")]
    InvalidFilter { field: &'static str, value: String },
    #[error("Retention must be at least one day")]
    InvalidRetention,
}

#[derive(Debug, thiserror::Error)]
pub enum CallQueueError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("call list storage failure: {0}")]
    Persistence(#[from] StoreError),
}

/// Service composing the ledger, memo ledger, directories, and clock.
pub struct CallQueueService<L, M, D> {
    ledger: Arc<L>,
    memos: Arc<M>,
    directory: Arc<D>,
    clock: Arc<dyn Clock>,
}

impl<L, M, D> CallQueueService<L, M, D>
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    pub fn new(ledger: Arc<L>, memos: Arc<M>, directory: Arc<D>) -> Self {
        Self::with_clock(ledger, memos, directory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        ledger: Arc<L>,
        memos: Arc<M>,
        directory: Arc<D>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger,
            memos,
            directory,
            clock,
        }
    }

    /// Record the outcome of a call. The memo is always appended; the entry only moves
    /// if it is still active.
    pub fn add_call_note(
        &self,
        actor: ActorId,
        subject: SubjectId,
        request: CallNoteRequest,
    ) -> Result<MutationOutcome, CallQueueError> {
        let text = request.note.trim().to_string();
        if text.is_empty() {
            return Err(ValidationError::EmptyNote.into());
        }

        let now = self.clock.now();
        let note = self
            .memos
            .append(
                NewCallNote {
                    subject_id: subject,
                    text: text.clone(),
                    author_id: actor,
                },
                now,
            )
            .map_err(|err| self.persistence_failure("add_call_note", subject, err))?;
        debug!(%actor, %subject, note = %note.id, "call note appended");

        let mutation = EntryMutation::plan(OperatorAction::AddNote {
            text,
            callback_at: request.callback_at,
            remove: request.remove_from_list,
        });
        self.apply(actor, subject, mutation, now)
    }

    pub fn schedule_callback(
        &self,
        actor: ActorId,
        subject: SubjectId,
        request: ScheduleCallbackRequest,
    ) -> Result<MutationOutcome, CallQueueError> {
        let callback_at = request.callback_at.ok_or(ValidationError::MissingCallback)?;
        let mutation = EntryMutation::plan(OperatorAction::ScheduleCallback {
            callback_at,
            priority: request.priority,
        });
        self.apply(actor, subject, mutation, self.clock.now())
    }

    pub fn remove_from_list(
        &self,
        actor: ActorId,
        subject: SubjectId,
        request: RemoveRequest,
    ) -> Result<MutationOutcome, CallQueueError> {
        let mutation = EntryMutation::plan(OperatorAction::Remove {
            reason: request.reason.unwrap_or_default(),
        });
        self.apply(actor, subject, mutation, self.clock.now())
    }

    /// Bind an agent to the subject's active entry. The latest assignment wins.
    pub fn assign_agent(
        &self,
        actor: ActorId,
        subject: SubjectId,
        request: AssignAgentRequest,
    ) -> Result<MutationOutcome, CallQueueError> {
        self.ensure_call_agent(request.agent_id)?;
        let mutation = EntryMutation::plan(OperatorAction::AssignAgent {
            agent_id: request.agent_id,
        });
        self.apply(actor, subject, mutation, self.clock.now())
    }

    /// Ranked, bucketed view of the active queue.
    pub fn list(&self, filter: &QueueFilter) -> Result<QueueView, CallQueueError> {
        let clock = CallbackClock::capture(self.clock.as_ref());
        let snapshot = self.ledger.active_snapshot()?;

        let subject_ids: Vec<SubjectId> = snapshot.iter().map(|entry| entry.subject_id).collect();
        let subjects = self.directory.subjects(&subject_ids)?;
        let agents = self.directory.call_agents()?;

        Ok(query::build_view(snapshot, filter, &subjects, &agents, clock))
    }

    pub fn summary(&self) -> Result<QueueSummary, CallQueueError> {
        let clock = CallbackClock::capture(self.clock.as_ref());
        let snapshot = self.ledger.active_snapshot()?;
        Ok(query::summarize(&snapshot, clock))
    }

    /// Intake hook for the external lifecycle trigger.
    pub fn enqueue(&self, request: NewCallListEntry) -> Result<EnqueueOutcome, CallQueueError> {
        if request.max_attempts == Some(0) {
            return Err(ValidationError::InvalidMaxAttempts.into());
        }
        if let Some(agent) = request.assigned_agent {
            self.ensure_call_agent(agent)?;
        }

        let subject = request.subject_id;
        let outcome = self
            .ledger
            .enqueue(request, self.clock.now())
            .map_err(|err| self.persistence_failure("enqueue", subject, err))?;

        match &outcome {
            EnqueueOutcome::Created(entry) => info!(
                %subject,
                entry = %entry.id,
                list_type = entry.list_type.label(),
                priority = entry.priority.label(),
                "subject added to call list"
            ),
            EnqueueOutcome::Refreshed(entry) => info!(
                %subject,
                entry = %entry.id,
                list_type = entry.list_type.label(),
                "active call list entry refreshed"
            ),
        }
        Ok(outcome)
    }

    pub fn history(&self, subject: SubjectId) -> Result<SubjectHistory, CallQueueError> {
        Ok(SubjectHistory {
            subject_id: subject,
            entries: self.ledger.entries_for(subject)?,
            notes: self.memos.notes_for(subject)?,
        })
    }

    /// Delete completed/removed entries untouched for `retention_days`. Notes are kept.
    pub fn purge_retired(&self, retention_days: u32) -> Result<usize, CallQueueError> {
        if retention_days == 0 {
            return Err(ValidationError::InvalidRetention.into());
        }
        let cutoff = Duration::try_days(i64::from(retention_days))
            .and_then(|window| self.clock.now().checked_sub_signed(window))
            .ok_or(ValidationError::InvalidRetention)?;
        let purged = self.ledger.purge_retired(cutoff)?;
        info!(purged, %cutoff, "purged retired call list entries");
        Ok(purged)
    }

    fn ensure_call_agent(&self, agent: AgentId) -> Result<(), CallQueueError> {
        let known = self
            .directory
            .call_agents()?
            .iter()
            .any(|candidate| candidate.id == agent);
        if known {
            Ok(())
        } else {
            Err(ValidationError::UnknownAgent(agent).into())
        }
    }

    fn apply(
        &self,
        actor: ActorId,
        subject: SubjectId,
        mutation: EntryMutation,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, CallQueueError> {
        let outcome = self
            .ledger
            .apply_if_active(subject, &mutation, at)
            .map_err(|err| self.persistence_failure(mutation.kind(), subject, err))?;

        match outcome {
            MutationOutcome::Applied => {
                info!(%actor, %subject, action = mutation.kind(), "call list entry updated")
            }
            MutationOutcome::NoOpStale => debug!(
                %actor,
                %subject,
                action = mutation.kind(),
                "no active call list entry; action absorbed"
            ),
        }
        Ok(outcome)
    }

    fn persistence_failure(
        &self,
        action: &'static str,
        subject: SubjectId,
        err: StoreError,
    ) -> CallQueueError {
        error!(%subject, action, error = %err, "call list store failure");
        CallQueueError::Persistence(err)
    }
}
