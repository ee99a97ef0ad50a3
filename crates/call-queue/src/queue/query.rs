//! Ranked, bucketed views over the active call list.
//!
//! Nothing here is cached: every view is derived from one ledger snapshot and one
//! captured instant, and the counters are recomputed from the filtered rows.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::callback::CallbackClock;
use super::domain::{
    Agent, AgentId, CallListEntry, CallbackBucket, ListType, Priority, SubjectId, SubjectProfile,
};
use super::ranking;

/// Agent dimension of the filter. `None` at the filter level means any agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentFilter {
    Specific(AgentId),
    Unassigned,
}

impl AgentFilter {
    fn admits(self, assigned: Option<AgentId>) -> bool {
        match self {
            AgentFilter::Specific(agent) => assigned == Some(agent),
            AgentFilter::Unassigned => assigned.is_none(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueFilter {
    pub list_type: Option<ListType>,
    pub priority: Option<Priority>,
    pub agent: Option<AgentFilter>,
    pub search: Option<String>,
}

impl QueueFilter {
    fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    fn admits_entry(&self, entry: &CallListEntry) -> bool {
        self.list_type.map_or(true, |list_type| entry.list_type == list_type)
            && self.priority.map_or(true, |priority| entry.priority == priority)
            && self.agent.map_or(true, |agent| agent.admits(entry.assigned_agent))
    }

    /// Subjects missing from the directory only survive when no search is requested.
    fn admits_subject(&self, subject: Option<&SubjectProfile>) -> bool {
        match (self.search_term(), subject) {
            (None, _) => true,
            (Some(term), Some(profile)) => profile.matches(term),
            (Some(_), None) => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueEntryView {
    #[serde(flatten)]
    pub entry: CallListEntry,
    pub type_display: &'static str,
    pub callback_status: CallbackBucket,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
    pub attempts_exhausted: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounters {
    pub total: usize,
    pub new_application: usize,
    pub pre_approval: usize,
    pub general: usize,
    pub paid_client: usize,
    pub urgent: usize,
    pub due: usize,
}

impl QueueCounters {
    fn record(&mut self, list_type: ListType, priority: Priority, bucket: CallbackBucket) {
        self.total += 1;
        match list_type {
            ListType::NewApplication => self.new_application += 1,
            ListType::PreApproval => self.pre_approval += 1,
            ListType::General => self.general += 1,
            ListType::PaidClient => self.paid_client += 1,
        }
        if priority == Priority::Urgent {
            self.urgent += 1;
        }
        if bucket == CallbackBucket::Due {
            self.due += 1;
        }
    }

    pub fn for_list_type(&self, list_type: ListType) -> usize {
        match list_type {
            ListType::NewApplication => self.new_application,
            ListType::PreApproval => self.pre_approval,
            ListType::General => self.general,
            ListType::PaidClient => self.paid_client,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueView {
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<QueueEntryView>,
    pub counters: QueueCounters,
}

/// Build the operator view from one snapshot of active entries.
pub fn build_view(
    snapshot: Vec<CallListEntry>,
    filter: &QueueFilter,
    subjects: &HashMap<SubjectId, SubjectProfile>,
    agents: &[Agent],
    clock: CallbackClock,
) -> QueueView {
    let candidates: Vec<CallListEntry> = snapshot
        .into_iter()
        .filter(|entry| entry.is_active() && filter.admits_entry(entry))
        .filter(|entry| filter.admits_subject(subjects.get(&entry.subject_id)))
        .collect();

    let mut counters = QueueCounters::default();
    let entries = ranking::rank(candidates)
        .into_iter()
        .map(|entry| {
            let callback_status = clock.classify(&entry);
            counters.record(entry.list_type, entry.priority, callback_status);

            let agent_name = entry.assigned_agent.and_then(|assigned| {
                agents
                    .iter()
                    .find(|agent| agent.id == assigned)
                    .map(Agent::display_name)
            });

            QueueEntryView {
                type_display: entry.list_type.display_label(),
                callback_status,
                subject: subjects.get(&entry.subject_id).cloned(),
                agent_name,
                attempts_exhausted: entry.attempts_exhausted(),
                entry,
            }
        })
        .collect();

    QueueView {
        generated_at: clock.now(),
        entries,
        counters,
    }
}

/// Headline badge for the whole queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Calm,
    Attention,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QueueSummary {
    pub total: usize,
    pub new_applications: usize,
    pub urgent: usize,
    pub due: usize,
    pub unassigned: usize,
    pub alert_level: AlertLevel,
}

/// Unfiltered roll-up of the active queue, bucketed against one instant.
pub fn summarize(snapshot: &[CallListEntry], clock: CallbackClock) -> QueueSummary {
    let active = snapshot.iter().filter(|entry| entry.is_active());

    let mut summary = QueueSummary {
        total: 0,
        new_applications: 0,
        urgent: 0,
        due: 0,
        unassigned: 0,
        alert_level: AlertLevel::Calm,
    };
    for entry in active {
        summary.total += 1;
        if entry.list_type == ListType::NewApplication {
            summary.new_applications += 1;
        }
        if entry.priority == Priority::Urgent {
            summary.urgent += 1;
        }
        if clock.classify(entry) == CallbackBucket::Due {
            summary.due += 1;
        }
        if entry.assigned_agent.is_none() {
            summary.unassigned += 1;
        }
    }

    summary.alert_level = if summary.urgent > 0 || summary.due > 0 {
        AlertLevel::Critical
    } else if summary.new_applications > 0 {
        AlertLevel::Attention
    } else {
        AlertLevel::Calm
    };
    summary
}
