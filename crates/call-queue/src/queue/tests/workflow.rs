use super::common::*;

use crate::queue::domain::{AgentId, EntryStatus, ListType, Priority};
use crate::queue::workflow::{EntryMutation, MutationOutcome, OperatorAction};

#[test]
fn note_without_callback_marks_contacted_and_counts_attempt() {
    let mut current = entry(1, 1, ListType::NewApplication, Priority::High, minutes(0));
    current.callback_at = Some(minutes(10));

    let mutation = EntryMutation::plan(OperatorAction::AddNote {
        text: "Left voicemail".to_string(),
        callback_at: None,
        remove: false,
    });
    let outcome = mutation.apply(&mut current, minutes(20));

    assert_eq!(outcome, MutationOutcome::Applied);
    assert_eq!(current.status, EntryStatus::Contacted);
    assert_eq!(current.call_attempts, 1);
    assert_eq!(current.callback_at, None);
    assert_eq!(current.notes.as_deref(), Some("Left voicemail"));
    assert_eq!(current.updated_at, minutes(20));
}

#[test]
fn note_with_callback_returns_contacted_entry_to_pending() {
    let mut current = entry(1, 1, ListType::General, Priority::Normal, minutes(0));
    current.status = EntryStatus::Contacted;
    current.call_attempts = 1;
    current.callback_at = Some(minutes(45));

    EntryMutation::plan(OperatorAction::AddNote {
        text: "Asked to call back Friday".to_string(),
        callback_at: Some(minutes(2_000)),
        remove: false,
    })
    .apply(&mut current, minutes(30));

    assert_eq!(current.status, EntryStatus::Pending);
    assert_eq!(current.call_attempts, 2);
    assert_eq!(current.callback_at, Some(minutes(2_000)));
}

#[test]
fn note_with_remove_completes_and_clears_callback() {
    let mut current = entry(1, 1, ListType::PreApproval, Priority::Normal, minutes(0));
    current.callback_at = Some(minutes(90));

    let mutation = EntryMutation::plan(OperatorAction::AddNote {
        text: "Loan funded".to_string(),
        callback_at: Some(minutes(120)),
        remove: true,
    });
    assert!(matches!(mutation, EntryMutation::Complete { .. }));
    mutation.apply(&mut current, minutes(45));

    assert_eq!(current.status, EntryStatus::Completed);
    assert_eq!(current.callback_at, None);
    assert_eq!(current.call_attempts, 0);
}

#[test]
fn reschedule_sets_priority_and_callback() {
    let mut current = entry(1, 1, ListType::General, Priority::Low, minutes(0));
    current.status = EntryStatus::Contacted;

    EntryMutation::plan(OperatorAction::ScheduleCallback {
        callback_at: minutes(300),
        priority: Priority::Urgent,
    })
    .apply(&mut current, minutes(5));

    assert_eq!(current.status, EntryStatus::Pending);
    assert_eq!(current.priority, Priority::Urgent);
    assert_eq!(current.callback_at, Some(minutes(300)));
    assert_eq!(current.call_attempts, 0);
}

#[test]
fn blank_removal_reason_uses_default() {
    let mutation = EntryMutation::plan(OperatorAction::Remove {
        reason: "   ".to_string(),
    });
    assert_eq!(
        mutation,
        EntryMutation::Remove {
            reason: "Manual removal".to_string()
        }
    );

    let mut current = entry(1, 1, ListType::General, Priority::Normal, minutes(0));
    mutation.apply(&mut current, minutes(1));
    assert_eq!(current.status, EntryStatus::Removed);
    assert_eq!(current.notes.as_deref(), Some("Manual removal"));
}

#[test]
fn assignment_leaves_workflow_fields_alone() {
    let mut current = entry(1, 1, ListType::General, Priority::High, minutes(0));
    current.status = EntryStatus::Contacted;
    current.call_attempts = 2;
    current.callback_at = Some(minutes(400));
    let before = current.clone();

    EntryMutation::plan(OperatorAction::AssignAgent {
        agent_id: AgentId(20),
    })
    .apply(&mut current, minutes(3));

    assert_eq!(current.assigned_agent, Some(AgentId(20)));
    assert_eq!(current.status, before.status);
    assert_eq!(current.call_attempts, before.call_attempts);
    assert_eq!(current.callback_at, before.callback_at);
    assert_eq!(current.priority, before.priority);
}

#[test]
fn terminal_entries_are_never_touched() {
    for status in [EntryStatus::Completed, EntryStatus::Removed] {
        let mut current = entry(1, 1, ListType::General, Priority::Normal, minutes(0));
        current.status = status;
        let before = current.clone();

        let outcome = EntryMutation::plan(OperatorAction::ScheduleCallback {
            callback_at: minutes(100),
            priority: Priority::Urgent,
        })
        .apply(&mut current, minutes(50));

        assert_eq!(outcome, MutationOutcome::NoOpStale);
        assert_eq!(current, before);
    }
}

#[test]
fn attempts_exceeding_ceiling_stay_active() {
    let mut current = entry(1, 1, ListType::PaidClient, Priority::Normal, minutes(0));
    for offset in 1..=3 {
        EntryMutation::RecordContact {
            notes: format!("Attempt {offset}"),
        }
        .apply(&mut current, minutes(offset));
    }

    assert_eq!(current.call_attempts, 3);
    assert!(current.attempts_exhausted());
    assert!(current.is_active());
}
