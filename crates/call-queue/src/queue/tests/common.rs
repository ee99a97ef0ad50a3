use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::queue::callback::Clock;
use crate::queue::domain::{
    Agent, AgentId, AgentRole, CallListEntry, CallNote, EntryId, EntryStatus, ListType,
    NewCallListEntry, NewCallNote, NoteId, Priority, SubjectId, SubjectProfile,
};
use crate::queue::repository::{
    AgentDirectory, CallListLedger, EnqueueOutcome, MemoLedger, StoreError, SubjectDirectory,
};
use crate::queue::service::CallQueueService;
use crate::queue::store::StaticDirectory;
use crate::queue::workflow::{EntryMutation, MutationOutcome};

pub(super) const CALLER: AgentId = AgentId(20);
pub(super) const VIEWER: AgentId = AgentId(30);

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 7, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn minutes(offset: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(offset)
}

pub(super) fn entry(
    id: u64,
    subject: u64,
    list_type: ListType,
    priority: Priority,
    created_at: DateTime<Utc>,
) -> CallListEntry {
    CallListEntry {
        id: EntryId(id),
        subject_id: SubjectId(subject),
        list_type,
        priority,
        status: EntryStatus::Pending,
        call_attempts: 0,
        max_attempts: list_type.default_max_attempts(),
        callback_at: None,
        assigned_agent: None,
        notes: None,
        created_at,
        updated_at: created_at,
    }
}

pub(super) fn subject(id: u64, first: &str, last: &str, reference: &str) -> SubjectProfile {
    SubjectProfile {
        id: SubjectId(id),
        first_name: first.to_string(),
        last_name: last.to_string(),
        reference: reference.to_string(),
        email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
        phone: None,
    }
}

pub(super) fn directory() -> StaticDirectory {
    StaticDirectory::default()
        .with_subject(subject(1, "Dana", "Whitfield", "LF-1001"))
        .with_subject(subject(2, "Marcus", "Bell", "LF-1002"))
        .with_subject(subject(3, "Priya", "Nair", "LF-1003"))
        .with_agent(Agent {
            id: CALLER,
            first_name: "Mara".to_string(),
            last_name: "Ortiz".to_string(),
            role: AgentRole::Agent,
        })
        .with_agent(Agent {
            id: VIEWER,
            first_name: "Quinn".to_string(),
            last_name: "Hale".to_string(),
            role: AgentRole::Other,
        })
}

#[derive(Debug)]
pub(super) struct FixedClock(pub(super) Mutex<DateTime<Utc>>);

impl FixedClock {
    pub(super) fn at(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(Mutex::new(now)))
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.0.lock().expect("clock lock");
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().expect("clock lock")
    }
}

/// In-memory ledger with the same conditional-write semantics as the SQLite store.
#[derive(Default)]
pub(super) struct MemoryLedger {
    entries: Mutex<Vec<CallListEntry>>,
}

impl MemoryLedger {
    pub(super) fn seeded(entries: Vec<CallListEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
        }
    }

    pub(super) fn all(&self) -> Vec<CallListEntry> {
        self.entries.lock().expect("ledger lock").clone()
    }

    pub(super) fn latest(&self, subject: u64) -> CallListEntry {
        self.all()
            .into_iter()
            .filter(|entry| entry.subject_id == SubjectId(subject))
            .last()
            .expect("subject has an entry")
    }
}

impl CallListLedger for MemoryLedger {
    fn enqueue(
        &self,
        request: NewCallListEntry,
        at: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, StoreError> {
        let mut entries = self.entries.lock().expect("ledger lock");
        if let Some(current) = entries
            .iter_mut()
            .find(|entry| entry.subject_id == request.subject_id && entry.is_active())
        {
            current.list_type = request.list_type;
            current.priority = request.priority;
            current.max_attempts = request.effective_max_attempts();
            current.callback_at = request.callback_at;
            if request.notes.is_some() {
                current.notes = request.notes;
            }
            if request.assigned_agent.is_some() {
                current.assigned_agent = request.assigned_agent;
            }
            current.updated_at = at;
            return Ok(EnqueueOutcome::Refreshed(current.clone()));
        }

        let created = CallListEntry {
            id: EntryId(entries.len() as u64 + 1),
            subject_id: request.subject_id,
            list_type: request.list_type,
            priority: request.priority,
            status: EntryStatus::Pending,
            call_attempts: 0,
            max_attempts: request.effective_max_attempts(),
            callback_at: request.callback_at,
            assigned_agent: request.assigned_agent,
            notes: request.notes,
            created_at: at,
            updated_at: at,
        };
        entries.push(created.clone());
        Ok(EnqueueOutcome::Created(created))
    }

    fn fetch_active(&self, subject: SubjectId) -> Result<Option<CallListEntry>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .find(|entry| entry.subject_id == subject && entry.is_active()))
    }

    fn entries_for(&self, subject: SubjectId) -> Result<Vec<CallListEntry>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|entry| entry.subject_id == subject)
            .collect())
    }

    fn apply_if_active(
        &self,
        subject: SubjectId,
        mutation: &EntryMutation,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        let mut entries = self.entries.lock().expect("ledger lock");
        match entries
            .iter_mut()
            .find(|entry| entry.subject_id == subject && entry.is_active())
        {
            Some(entry) => Ok(mutation.apply(entry, at)),
            None => Ok(MutationOutcome::NoOpStale),
        }
    }

    fn active_snapshot(&self) -> Result<Vec<CallListEntry>, StoreError> {
        Ok(self
            .all()
            .into_iter()
            .filter(CallListEntry::is_active)
            .collect())
    }

    fn purge_retired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut entries = self.entries.lock().expect("ledger lock");
        let before = entries.len();
        entries.retain(|entry| entry.is_active() || entry.updated_at >= cutoff);
        Ok(before - entries.len())
    }
}

#[derive(Default)]
pub(super) struct MemoryMemos {
    notes: Mutex<Vec<CallNote>>,
}

impl MemoryMemos {
    pub(super) fn texts(&self, subject: u64) -> Vec<String> {
        self.notes
            .lock()
            .expect("memo lock")
            .iter()
            .filter(|note| note.subject_id == SubjectId(subject))
            .map(|note| note.text.clone())
            .collect()
    }
}

impl MemoLedger for MemoryMemos {
    fn append(&self, note: NewCallNote, at: DateTime<Utc>) -> Result<CallNote, StoreError> {
        let mut notes = self.notes.lock().expect("memo lock");
        let stored = CallNote {
            id: NoteId(notes.len() as u64 + 1),
            subject_id: note.subject_id,
            text: note.text,
            author_id: note.author_id,
            created_at: at,
        };
        notes.push(stored.clone());
        Ok(stored)
    }

    fn notes_for(&self, subject: SubjectId) -> Result<Vec<CallNote>, StoreError> {
        Ok(self
            .notes
            .lock()
            .expect("memo lock")
            .iter()
            .filter(|note| note.subject_id == subject)
            .cloned()
            .collect())
    }
}

pub(super) struct UnavailableLedger;

impl CallListLedger for UnavailableLedger {
    fn enqueue(&self, _: NewCallListEntry, _: DateTime<Utc>) -> Result<EnqueueOutcome, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn fetch_active(&self, _: SubjectId) -> Result<Option<CallListEntry>, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn entries_for(&self, _: SubjectId) -> Result<Vec<CallListEntry>, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn apply_if_active(
        &self,
        _: SubjectId,
        _: &EntryMutation,
        _: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn active_snapshot(&self) -> Result<Vec<CallListEntry>, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }

    fn purge_retired(&self, _: DateTime<Utc>) -> Result<usize, StoreError> {
        Err(StoreError::Unavailable("ledger offline".to_string()))
    }
}

/// Directory with no subjects and no call agents.
pub(super) struct EmptyDirectory;

impl SubjectDirectory for EmptyDirectory {
    fn subjects(&self, _: &[SubjectId]) -> Result<HashMap<SubjectId, SubjectProfile>, StoreError> {
        Ok(HashMap::new())
    }
}

impl AgentDirectory for EmptyDirectory {
    fn call_agents(&self) -> Result<Vec<Agent>, StoreError> {
        Ok(Vec::new())
    }
}

pub(super) type MemoryService = CallQueueService<MemoryLedger, MemoryMemos, StaticDirectory>;

pub(super) struct Harness {
    pub(super) service: Arc<MemoryService>,
    pub(super) ledger: Arc<MemoryLedger>,
    pub(super) memos: Arc<MemoryMemos>,
    pub(super) clock: Arc<FixedClock>,
}

pub(super) fn harness(entries: Vec<CallListEntry>) -> Harness {
    let ledger = Arc::new(MemoryLedger::seeded(entries));
    let memos = Arc::new(MemoryMemos::default());
    let clock = FixedClock::at(minutes(60));
    let service = Arc::new(CallQueueService::with_clock(
        Arc::clone(&ledger),
        Arc::clone(&memos),
        Arc::new(directory()),
        clock.clone(),
    ));
    Harness {
        service,
        ledger,
        memos,
        clock,
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("valid json body")
}
