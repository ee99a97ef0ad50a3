use crate::cli::render_view;
use call_queue::error::AppError;
use call_queue::queue::{
    write_csv, ActionEnvelope, ActionKind, ActorId, Agent, AgentId, AgentRole,
    AssignAgentRequest, CallNoteRequest, CallQueueError, CallQueueService, Clock, ListType,
    MutationOutcome, NewCallListEntry, Priority, QueueFilter, RemoveRequest,
    ScheduleCallbackRequest, SqliteCallStore, StaticDirectory, SubjectId, SubjectProfile,
};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const SUPERVISOR: ActorId = ActorId(1);

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Start of the simulated morning (RFC 3339 or YYYY-MM-DD). Defaults to now.
    #[arg(long, value_parser = crate::infra::parse_datetime)]
    pub(crate) start: Option<DateTime<Utc>>,
    /// Also write the final call sheet as CSV
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
}

/// Clock the demo moves forward by hand between operator actions.
struct DemoClock(Mutex<DateTime<Utc>>);

impl DemoClock {
    fn advance(&self, by: Duration) {
        if let Ok(mut now) = self.0.lock() {
            *now += by;
        }
    }
}

impl Clock for DemoClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { start, export } = args;
    let start = start.unwrap_or_else(Utc::now);

    let store = Arc::new(SqliteCallStore::open_in_memory()?);
    let clock = Arc::new(DemoClock(Mutex::new(start)));
    let service = CallQueueService::with_clock(
        Arc::clone(&store),
        store,
        Arc::new(demo_directory()),
        clock.clone(),
    );

    println!("Loan call queue demo");
    println!("\nIntake");
    let intake = [
        (101, ListType::General, Priority::Normal, "Quarterly check-in"),
        (102, ListType::PaidClient, Priority::Urgent, "Referral follow-up"),
        (103, ListType::NewApplication, Priority::Normal, "New loan application submitted"),
        (104, ListType::PreApproval, Priority::High, "Pre-approval issued"),
        (105, ListType::NewApplication, Priority::Urgent, "New loan application submitted"),
    ];
    for (subject, list_type, priority, note) in intake {
        let mut request = NewCallListEntry::new(SubjectId(subject), list_type, priority);
        request.notes = Some(note.to_string());
        let outcome = service.enqueue(request)?;
        println!(
            "- subject {} queued as {} / {} (max {} attempts)",
            subject,
            list_type.display_label(),
            priority.label(),
            outcome.entry().max_attempts
        );
        clock.advance(Duration::minutes(7));
    }

    println!();
    render_view(&service.list(&QueueFilter::default())?);

    println!("\nOperator actions");
    clock.advance(Duration::minutes(20));
    report(
        "Note on 105 with callback tomorrow",
        ActionKind::AddCallNote,
        service.add_call_note(
            SUPERVISOR,
            SubjectId(105),
            CallNoteRequest {
                note: "Spoke with applicant, documents pending".to_string(),
                callback_at: Some(clock.now() + Duration::days(1)),
                remove_from_list: false,
            },
        ),
    );
    report(
        "Assign 103 to Mara Ortiz",
        ActionKind::AssignAgent,
        service.assign_agent(
            SUPERVISOR,
            SubjectId(103),
            AssignAgentRequest {
                agent_id: AgentId(20),
            },
        ),
    );
    report(
        "Assign 104 to an underwriter",
        ActionKind::AssignAgent,
        service.assign_agent(
            SUPERVISOR,
            SubjectId(104),
            AssignAgentRequest {
                agent_id: AgentId(22),
            },
        ),
    );
    report(
        "Callback for 101 this morning",
        ActionKind::ScheduleCallback,
        service.schedule_callback(
            SUPERVISOR,
            SubjectId(101),
            ScheduleCallbackRequest {
                callback_at: Some(clock.now() - Duration::minutes(5)),
                priority: Priority::High,
            },
        ),
    );
    report(
        "Remove 102",
        ActionKind::RemoveFromList,
        service.remove_from_list(
            SUPERVISOR,
            SubjectId(102),
            RemoveRequest {
                reason: Some("Client asked not to be contacted".to_string()),
            },
        ),
    );
    report(
        "Remove 102 again (second operator)",
        ActionKind::RemoveFromList,
        service.remove_from_list(SUPERVISOR, SubjectId(102), RemoveRequest::default()),
    );

    println!();
    let view = service.list(&QueueFilter::default())?;
    render_view(&view);

    let summary = service.summary()?;
    println!(
        "\nSummary: {} active | {} urgent | {} due | {} unassigned | alert {:?}",
        summary.total, summary.urgent, summary.due, summary.unassigned, summary.alert_level
    );

    let history = service.history(SubjectId(102))?;
    println!(
        "History for 102: {} entries, {} notes, final status {}",
        history.entries.len(),
        history.notes.len(),
        history
            .entries
            .last()
            .map(|entry| entry.status.label())
            .unwrap_or("none")
    );

    if let Some(path) = export {
        write_csv(&view, BufWriter::new(File::create(&path)?))?;
        println!("Call sheet written to {}", path.display());
    }

    Ok(())
}

fn report(label: &str, action: ActionKind, result: Result<MutationOutcome, CallQueueError>) {
    let envelope = ActionEnvelope::from_result(action, &result);
    match serde_json::to_string(&envelope) {
        Ok(json) => println!("- {label}: {json}"),
        Err(err) => println!("- {label}: response unavailable ({err})"),
    }
}

fn demo_directory() -> StaticDirectory {
    let subjects = [
        (101, "Dana", "Whitfield", "LF-1001"),
        (102, "Marcus", "Bell", "LF-1002"),
        (103, "Priya", "Nair", "LF-1003"),
        (104, "Tomas", "Ruiz", "LF-1004"),
        (105, "Grace", "Okafor", "LF-1005"),
    ];
    let agents = [
        (20, "Mara", "Ortiz", AgentRole::Agent),
        (21, "Ali", "Chen", AgentRole::Admin),
        (22, "Bo", "Kim", AgentRole::Other),
    ];

    StaticDirectory::new(
        subjects
            .into_iter()
            .map(|(id, first, last, reference)| SubjectProfile {
                id: SubjectId(id),
                first_name: first.to_string(),
                last_name: last.to_string(),
                reference: reference.to_string(),
                email: format!("{}.{}@example.com", first.to_lowercase(), last.to_lowercase()),
                phone: None,
            })
            .collect(),
        agents
            .into_iter()
            .map(|(id, first, last, role)| Agent {
                id: AgentId(id),
                first_name: first.to_string(),
                last_name: last.to_string(),
                role,
            })
            .collect(),
    )
}
