use serde::{Deserialize, Serialize};

use super::service::CallQueueError;
use super::workflow::MutationOutcome;

const PERSISTENCE_MESSAGE: &str = "The call list could not be updated. Please try again.";

/// Operator actions exposed over the request/response surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    AddCallNote,
    ScheduleCallback,
    RemoveFromList,
    AssignAgent,
}

impl ActionKind {
    const fn applied_message(self) -> &'static str {
        match self {
            ActionKind::AddCallNote => "Call note added successfully",
            ActionKind::ScheduleCallback => "Callback scheduled successfully",
            ActionKind::RemoveFromList => "Client removed from call list",
            ActionKind::AssignAgent => "Agent assigned successfully",
        }
    }

    const fn stale_message(self) -> &'static str {
        match self {
            ActionKind::AddCallNote => "Call note added; the call list entry was already closed",
            ActionKind::ScheduleCallback
            | ActionKind::RemoveFromList
            | ActionKind::AssignAgent => "No active call list entry; nothing changed",
        }
    }
}

/// Uniform `{success, message}` response for every operator action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<MutationOutcome>,
}

impl ActionEnvelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            outcome: None,
        }
    }

    /// Persistence details stay in the logs; operators get a retry hint.
    pub fn from_result(action: ActionKind, result: &Result<MutationOutcome, CallQueueError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: true,
                message: match outcome {
                    MutationOutcome::Applied => action.applied_message(),
                    MutationOutcome::NoOpStale => action.stale_message(),
                }
                .to_string(),
                outcome: Some(*outcome),
            },
            Err(CallQueueError::Validation(err)) => Self::failure(err.to_string()),
            Err(CallQueueError::Persistence(_)) => Self::failure(PERSISTENCE_MESSAGE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::repository::StoreError;
    use crate::queue::service::ValidationError;

    #[test]
    fn stale_outcomes_still_report_success() {
        let envelope =
            ActionEnvelope::from_result(ActionKind::RemoveFromList, &Ok(MutationOutcome::NoOpStale));
        assert!(envelope.success);
        assert_eq!(envelope.outcome, Some(MutationOutcome::NoOpStale));
    }

    #[test]
    fn validation_message_is_verbatim_and_persistence_is_generic() {
        let validation = ActionEnvelope::from_result(
            ActionKind::AddCallNote,
            &Err(ValidationError::EmptyNote.into()),
        );
        assert!(!validation.success);
        assert_eq!(validation.message, "Note is required");

        let persistence = ActionEnvelope::from_result(
            ActionKind::AssignAgent,
            &Err(StoreError::Unavailable("disk full".to_string()).into()),
        );
        assert!(!persistence.success);
        assert!(!persistence.message.contains("disk full"));
    }
}
