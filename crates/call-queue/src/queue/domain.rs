use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Ledger-assigned identifier of a call list entry.
    EntryId
);
id_type!(NoteId);
id_type!(
    /// Applicant or client the entry is about; owned by the subject directory.
    SubjectId
);
id_type!(AgentId);
id_type!(
    /// Operator performing an action. Always passed explicitly, never read from a session.
    ActorId
);

/// Business category that put the subject on the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    NewApplication,
    PreApproval,
    General,
    PaidClient,
}

impl ListType {
    pub const ALL: [ListType; 4] = [
        ListType::NewApplication,
        ListType::PreApproval,
        ListType::General,
        ListType::PaidClient,
    ];

    /// Lower ranks are called first.
    pub const fn rank(self) -> u8 {
        match self {
            ListType::NewApplication => 1,
            ListType::PreApproval => 2,
            ListType::General => 3,
            ListType::PaidClient => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            ListType::NewApplication => "new_application",
            ListType::PreApproval => "pre_approval",
            ListType::General => "general",
            ListType::PaidClient => "paid_client",
        }
    }

    pub const fn display_label(self) -> &'static str {
        match self {
            ListType::NewApplication => "New Application",
            ListType::PreApproval => "Pre-Approval",
            ListType::General => "General Follow-up",
            ListType::PaidClient => "Paid Client",
        }
    }

    /// Advisory attempt ceiling applied at intake when the caller does not supply one.
    pub const fn default_max_attempts(self) -> u32 {
        match self {
            ListType::NewApplication => 3,
            ListType::PreApproval => 5,
            ListType::General => 3,
            ListType::PaidClient => 2,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|list_type| list_type.label().eq_ignore_ascii_case(value.trim()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Normal,
    Low,
}

impl Priority {
    pub const ALL: [Priority; 4] = [
        Priority::Urgent,
        Priority::High,
        Priority::Normal,
        Priority::Low,
    ];

    pub const fn rank(self) -> u8 {
        match self {
            Priority::Urgent => 1,
            Priority::High => 2,
            Priority::Normal => 3,
            Priority::Low => 4,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Priority::Urgent => "urgent",
            Priority::High => "high",
            Priority::Normal => "normal",
            Priority::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|priority| priority.label().eq_ignore_ascii_case(value.trim()))
    }
}

/// Workflow status of an entry. `Completed` and `Removed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    Pending,
    Contacted,
    Completed,
    Removed,
}

impl EntryStatus {
    pub const fn is_active(self) -> bool {
        matches!(self, EntryStatus::Pending | EntryStatus::Contacted)
    }

    pub const fn label(self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Contacted => "contacted",
            EntryStatus::Completed => "completed",
            EntryStatus::Removed => "removed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(EntryStatus::Pending),
            "contacted" => Some(EntryStatus::Contacted),
            "completed" => Some(EntryStatus::Completed),
            "removed" => Some(EntryStatus::Removed),
            _ => None,
        }
    }
}

/// Read-time classification of an entry's callback urgency. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallbackBucket {
    Immediate,
    Scheduled,
    Due,
}

impl CallbackBucket {
    pub const fn label(self) -> &'static str {
        match self {
            CallbackBucket::Immediate => "Immediate",
            CallbackBucket::Scheduled => "Scheduled",
            CallbackBucket::Due => "Due",
        }
    }
}

/// One outstanding (or retired) contact obligation for a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallListEntry {
    pub id: EntryId,
    pub subject_id: SubjectId,
    pub list_type: ListType,
    pub priority: Priority,
    pub status: EntryStatus,
    pub call_attempts: u32,
    pub max_attempts: u32,
    pub callback_at: Option<DateTime<Utc>>,
    pub assigned_agent: Option<AgentId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallListEntry {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Display hint only; reaching the ceiling never changes the entry's status.
    pub fn attempts_exhausted(&self) -> bool {
        self.call_attempts >= self.max_attempts
    }
}

/// Intake request raised when a subject enters a qualifying business state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCallListEntry {
    pub subject_id: SubjectId,
    pub list_type: ListType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    #[serde(default)]
    pub callback_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub assigned_agent: Option<AgentId>,
}

impl NewCallListEntry {
    pub fn new(subject_id: SubjectId, list_type: ListType, priority: Priority) -> Self {
        Self {
            subject_id,
            list_type,
            priority,
            max_attempts: None,
            callback_at: None,
            notes: None,
            assigned_agent: None,
        }
    }

    pub fn effective_max_attempts(&self) -> u32 {
        self.max_attempts
            .unwrap_or_else(|| self.list_type.default_max_attempts())
    }
}

/// Append-only contact memo. Outlives the entry it was written against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNote {
    pub id: NoteId,
    pub subject_id: SubjectId,
    pub text: String,
    pub author_id: ActorId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallNote {
    pub subject_id: SubjectId,
    pub text: String,
    pub author_id: ActorId,
}

/// Identity fields joined in from the subject directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub id: SubjectId,
    pub first_name: String,
    pub last_name: String,
    pub reference: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

impl SubjectProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Case-insensitive substring match over name, reference, and email.
    pub fn matches(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let full_name = self.full_name();
        let fields = [
            self.first_name.as_str(),
            self.last_name.as_str(),
            full_name.as_str(),
            self.reference.as_str(),
            self.email.as_str(),
        ];
        let matched = fields
            .into_iter()
            .any(|field| field.to_lowercase().contains(&needle));
        matched
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Admin,
    Agent,
    #[serde(other)]
    Other,
}

impl AgentRole {
    pub const fn handles_calls(self) -> bool {
        matches!(self, AgentRole::Admin | AgentRole::Agent)
    }
}

/// Operator account as exposed by the agent directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub first_name: String,
    pub last_name: String,
    pub role: AgentRole,
}

impl Agent {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
