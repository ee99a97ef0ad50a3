//! SQLite-backed call ledger and memo ledger.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior};
use tracing::debug;

use crate::queue::domain::{
    AgentId, ActorId, CallListEntry, CallNote, EntryId, EntryStatus, ListType, NewCallListEntry,
    NewCallNote, NoteId, Priority, SubjectId,
};
use crate::queue::repository::{CallListLedger, EnqueueOutcome, MemoLedger, StoreError};
use crate::queue::workflow::{EntryMutation, MutationOutcome};

const ENTRY_COLUMNS: &str = "id, subject_id, list_type, priority, status, call_attempts, \
     max_attempts, callback_at, assigned_agent, notes, created_at, updated_at";

const ACTIVE_GUARD: &str = "status IN ('pending', 'contacted')";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS call_list_entries (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_id      INTEGER NOT NULL,
        list_type       TEXT NOT NULL,
        priority        TEXT NOT NULL,
        status          TEXT NOT NULL DEFAULT 'pending',
        call_attempts   INTEGER NOT NULL DEFAULT 0,
        max_attempts    INTEGER NOT NULL,
        callback_at     TEXT,
        assigned_agent  INTEGER,
        notes           TEXT,
        created_at      TEXT NOT NULL,
        updated_at      TEXT NOT NULL
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_call_list_one_active
        ON call_list_entries(subject_id) WHERE status IN ('pending', 'contacted');
    CREATE INDEX IF NOT EXISTS idx_call_list_status ON call_list_entries(status);

    CREATE TABLE IF NOT EXISTS call_notes (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        subject_id  INTEGER NOT NULL,
        text        TEXT NOT NULL,
        author_id   INTEGER NOT NULL,
        created_at  TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_call_notes_subject ON call_notes(subject_id);
";

/// Call ledger and memo ledger sharing one SQLite connection.
pub struct SqliteCallStore {
    conn: Mutex<Connection>,
}

impl SqliteCallStore {
    /// Open (and migrate) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory database. Contents vanish with the store.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("ledger connection lock poisoned".to_string()))
    }
}

impl CallListLedger for SqliteCallStore {
    fn enqueue(
        &self,
        entry: NewCallListEntry,
        at: DateTime<Utc>,
    ) -> Result<EnqueueOutcome, StoreError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(mut current) = select_active(&tx, entry.subject_id)? {
            current.list_type = entry.list_type;
            current.priority = entry.priority;
            current.max_attempts = entry.effective_max_attempts();
            current.callback_at = entry.callback_at;
            if entry.notes.is_some() {
                current.notes = entry.notes;
            }
            if entry.assigned_agent.is_some() {
                current.assigned_agent = entry.assigned_agent;
            }
            current.updated_at = at;

            write_active(&tx, &current)?;
            tx.commit()?;
            debug!(subject = %current.subject_id, entry = %current.id, "refreshed active entry");
            return Ok(EnqueueOutcome::Refreshed(current));
        }

        let max_attempts = entry.effective_max_attempts();
        tx.execute(
            "INSERT INTO call_list_entries (
                subject_id, list_type, priority, status, call_attempts, max_attempts,
                callback_at, assigned_agent, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?5, ?6, ?7, ?8, ?8)",
            params![
                id_to_sql(entry.subject_id.0)?,
                entry.list_type.label(),
                entry.priority.label(),
                max_attempts,
                entry.callback_at.map(format_timestamp),
                entry.assigned_agent.map(|agent| id_to_sql(agent.0)).transpose()?,
                entry.notes,
                format_timestamp(at),
            ],
        )
        .map_err(map_constraint)?;

        let id = id_from_sql(tx.last_insert_rowid())?;
        tx.commit()?;

        Ok(EnqueueOutcome::Created(CallListEntry {
            id: EntryId(id),
            subject_id: entry.subject_id,
            list_type: entry.list_type,
            priority: entry.priority,
            status: EntryStatus::Pending,
            call_attempts: 0,
            max_attempts,
            callback_at: entry.callback_at,
            assigned_agent: entry.assigned_agent,
            notes: entry.notes,
            created_at: at,
            updated_at: at,
        }))
    }

    fn fetch_active(&self, subject: SubjectId) -> Result<Option<CallListEntry>, StoreError> {
        let conn = self.connection()?;
        select_active(&conn, subject)
    }

    fn entries_for(&self, subject: SubjectId) -> Result<Vec<CallListEntry>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM call_list_entries WHERE subject_id = ?1 ORDER BY id"
        ))?;
        let rows = stmt.query_map(params![id_to_sql(subject.0)?], row_to_entry)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn apply_if_active(
        &self,
        subject: SubjectId,
        mutation: &EntryMutation,
        at: DateTime<Utc>,
    ) -> Result<MutationOutcome, StoreError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let Some(mut entry) = select_active(&tx, subject)? else {
            return Ok(MutationOutcome::NoOpStale);
        };
        if !mutation.apply(&mut entry, at).is_applied() {
            return Ok(MutationOutcome::NoOpStale);
        }

        if write_active(&tx, &entry)? == 0 {
            return Ok(MutationOutcome::NoOpStale);
        }
        tx.commit()?;
        Ok(MutationOutcome::Applied)
    }

    fn active_snapshot(&self) -> Result<Vec<CallListEntry>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM call_list_entries WHERE {ACTIVE_GUARD}"
        ))?;
        let rows = stmt.query_map([], row_to_entry)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }

    fn purge_retired(&self, cutoff: DateTime<Utc>) -> Result<usize, StoreError> {
        let conn = self.connection()?;
        let deleted = conn.execute(
            "DELETE FROM call_list_entries
             WHERE status IN ('completed', 'removed') AND updated_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(deleted)
    }
}

impl MemoLedger for SqliteCallStore {
    fn append(&self, note: NewCallNote, at: DateTime<Utc>) -> Result<CallNote, StoreError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT INTO call_notes (subject_id, text, author_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id_to_sql(note.subject_id.0)?,
                note.text,
                id_to_sql(note.author_id.0)?,
                format_timestamp(at),
            ],
        )?;
        let id = id_from_sql(conn.last_insert_rowid())?;

        Ok(CallNote {
            id: NoteId(id),
            subject_id: note.subject_id,
            text: note.text,
            author_id: note.author_id,
            created_at: at,
        })
    }

    fn notes_for(&self, subject: SubjectId) -> Result<Vec<CallNote>, StoreError> {
        let conn = self.connection()?;
        let mut stmt = conn.prepare(
            "SELECT id, subject_id, text, author_id, created_at
             FROM call_notes WHERE subject_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![id_to_sql(subject.0)?], |row| {
            Ok(CallNote {
                id: NoteId(read_id(row, 0)?),
                subject_id: SubjectId(read_id(row, 1)?),
                text: row.get(2)?,
                author_id: ActorId(read_id(row, 3)?),
                created_at: read_timestamp(row, 4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::from)
    }
}

fn select_active(conn: &Connection, subject: SubjectId) -> Result<Option<CallListEntry>, StoreError> {
    let entry = conn
        .query_row(
            &format!(
                "SELECT {ENTRY_COLUMNS} FROM call_list_entries
                 WHERE subject_id = ?1 AND {ACTIVE_GUARD}"
            ),
            params![id_to_sql(subject.0)?],
            row_to_entry,
        )
        .optional()?;
    Ok(entry)
}

/// Persist every mutable column, guarded on the row still being active.
fn write_active(conn: &Connection, entry: &CallListEntry) -> Result<usize, StoreError> {
    let changed = conn.execute(
        &format!(
            "UPDATE call_list_entries SET
                list_type = ?1, priority = ?2, status = ?3, call_attempts = ?4,
                max_attempts = ?5, callback_at = ?6, assigned_agent = ?7, notes = ?8,
                updated_at = ?9
             WHERE id = ?10 AND {ACTIVE_GUARD}"
        ),
        params![
            entry.list_type.label(),
            entry.priority.label(),
            entry.status.label(),
            entry.call_attempts,
            entry.max_attempts,
            entry.callback_at.map(format_timestamp),
            entry
                .assigned_agent
                .map(|agent| id_to_sql(agent.0))
                .transpose()?,
            entry.notes,
            format_timestamp(entry.updated_at),
            id_to_sql(entry.id.0)?,
        ],
    )?;
    Ok(changed)
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<CallListEntry> {
    let list_type: String = row.get(2)?;
    let priority: String = row.get(3)?;
    let status: String = row.get(4)?;
    let assigned_agent: Option<i64> = row.get(8)?;
    let callback_at: Option<String> = row.get(7)?;

    Ok(CallListEntry {
        id: EntryId(read_id(row, 0)?),
        subject_id: SubjectId(read_id(row, 1)?),
        list_type: ListType::parse(&list_type)
            .ok_or_else(|| conversion_error(2, format!("unknown list type '{list_type}'")))?,
        priority: Priority::parse(&priority)
            .ok_or_else(|| conversion_error(3, format!("unknown priority '{priority}'")))?,
        status: EntryStatus::parse(&status)
            .ok_or_else(|| conversion_error(4, format!("unknown status '{status}'")))?,
        call_attempts: row.get(5)?,
        max_attempts: row.get(6)?,
        callback_at: callback_at
            .map(|raw| parse_timestamp(7, &raw))
            .transpose()?,
        assigned_agent: assigned_agent
            .map(|raw| {
                u64::try_from(raw)
                    .map(AgentId)
                    .map_err(|_| conversion_error(8, format!("negative agent id {raw}")))
            })
            .transpose()?,
        notes: row.get(9)?,
        created_at: read_timestamp(row, 10)?,
        updated_at: read_timestamp(row, 11)?,
    })
}

/// Fixed-width UTC timestamps so text comparison matches chronological order.
fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|err| conversion_error(column, format!("invalid timestamp '{raw}': {err}")))
}

fn read_timestamp(row: &Row<'_>, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_timestamp(column, &raw)
}

fn read_id(row: &Row<'_>, column: usize) -> rusqlite::Result<u64> {
    let raw: i64 = row.get(column)?;
    u64::try_from(raw).map_err(|_| conversion_error(column, format!("negative id {raw}")))
}

fn id_to_sql(id: u64) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::Corrupt(format!("id {id} exceeds SQLite range")))
}

fn id_from_sql(id: i64) -> Result<u64, StoreError> {
    u64::try_from(id).map_err(|_| StoreError::Corrupt(format!("negative row id {id}")))
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn map_constraint(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return StoreError::Conflict;
        }
    }
    StoreError::Sqlite(err)
}
