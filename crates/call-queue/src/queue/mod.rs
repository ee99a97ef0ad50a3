//! Loan-applicant call queue: intake, ranking, callback bucketing, and operator actions.
//!
//! Entries live in a [`CallListLedger`]; operator actions are reduced to an
//! [`EntryMutation`] and applied only while the subject's entry is still active.

pub mod callback;
pub mod domain;
pub mod envelope;
pub mod export;
pub mod query;
pub mod ranking;
pub mod repository;
pub mod router;
pub mod service;
pub mod store;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use callback::{CallbackClock, Clock, SystemClock};
pub use domain::{
    ActorId, Agent, AgentId, AgentRole, CallListEntry, CallNote, CallbackBucket, EntryId,
    EntryStatus, ListType, NewCallListEntry, NewCallNote, NoteId, Priority, SubjectId,
    SubjectProfile,
};
pub use envelope::{ActionEnvelope, ActionKind};
pub use export::{write_csv, ExportError};
pub use query::{AgentFilter, AlertLevel, QueueCounters, QueueFilter, QueueSummary, QueueView};
pub use repository::{
    AgentDirectory, CallListLedger, EnqueueOutcome, MemoLedger, StoreError, SubjectDirectory,
};
pub use router::{call_list_router, ListParams, OPERATOR_HEADER};
pub use service::{
    AssignAgentRequest, CallNoteRequest, CallQueueError, CallQueueService, RemoveRequest,
    ScheduleCallbackRequest, SubjectHistory, ValidationError,
};
pub use store::{DirectoryError, SqliteCallStore, StaticDirectory};
pub use workflow::{EntryMutation, MutationOutcome, OperatorAction};
