use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::domain::{ActorId, AgentId, ListType, NewCallListEntry, Priority, SubjectId};
use super::envelope::{ActionEnvelope, ActionKind};
use super::query::{AgentFilter, QueueFilter};
use super::repository::{
    AgentDirectory, CallListLedger, EnqueueOutcome, MemoLedger, StoreError, SubjectDirectory,
};
use super::service::{
    AssignAgentRequest, CallNoteRequest, CallQueueError, CallQueueService, RemoveRequest,
    ScheduleCallbackRequest, ValidationError,
};
use super::workflow::MutationOutcome;

/// Header carrying the id of the operator performing an action.
pub const OPERATOR_HEADER: &str = "x-operator-id";

type SharedService<L, M, D> = Arc<CallQueueService<L, M, D>>;

/// Router exposing the call list view and operator actions.
pub fn call_list_router<L, M, D>(service: SharedService<L, M, D>) -> Router
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/call-list",
            get(list_handler::<L, M, D>).post(enqueue_handler::<L, M, D>),
        )
        .route("/api/v1/call-list/summary", get(summary_handler::<L, M, D>))
        .route(
            "/api/v1/call-list/:subject_id/history",
            get(history_handler::<L, M, D>),
        )
        .route(
            "/api/v1/call-list/:subject_id/notes",
            post(add_note_handler::<L, M, D>),
        )
        .route(
            "/api/v1/call-list/:subject_id/callback",
            post(schedule_callback_handler::<L, M, D>),
        )
        .route(
            "/api/v1/call-list/:subject_id/remove",
            post(remove_handler::<L, M, D>),
        )
        .route(
            "/api/v1/call-list/:subject_id/assign",
            post(assign_handler::<L, M, D>),
        )
        .with_state(service)
}

/// Raw list filters as typed by an operator; `all` (or an empty value) means "any".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    #[serde(default, rename = "type", alias = "list_type")]
    pub list_type: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
}

impl ListParams {
    pub fn into_filter(self) -> Result<QueueFilter, ValidationError> {
        let list_type = match any_or(self.list_type) {
            None => None,
            Some(raw) => Some(ListType::parse(&raw).ok_or(ValidationError::InvalidFilter {
                field: "type",
                value: raw,
            })?),
        };

        let priority = match any_or(self.priority) {
            None => None,
            Some(raw) => Some(Priority::parse(&raw).ok_or(ValidationError::InvalidFilter {
                field: "priority",
                value: raw,
            })?),
        };

        let agent = match any_or(self.agent) {
            None => None,
            Some(raw) if raw.eq_ignore_ascii_case("unassigned") => Some(AgentFilter::Unassigned),
            Some(raw) => match raw.parse::<u64>() {
                Ok(id) => Some(AgentFilter::Specific(AgentId(id))),
                Err(_) => {
                    return Err(ValidationError::InvalidFilter {
                        field: "agent",
                        value: raw,
                    })
                }
            },
        };

        Ok(QueueFilter {
            list_type,
            priority,
            agent,
            search: self.search.filter(|term| !term.trim().is_empty()),
        })
    }
}

fn any_or(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty() && !raw.eq_ignore_ascii_case("all"))
}

pub(crate) fn operator_from(headers: &HeaderMap) -> Result<ActorId, ValidationError> {
    headers
        .get(OPERATOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(ActorId)
        .ok_or(ValidationError::MissingActor)
}

/// Store calls are blocking; keep them off the async workers.
async fn run_blocking<T, F>(task: F) -> Result<T, CallQueueError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CallQueueError> + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(result) => result,
        Err(join_error) => Err(CallQueueError::Persistence(StoreError::Unavailable(format!(
            "store task aborted: {join_error}"
        )))),
    }
}

fn action_response(action: ActionKind, result: Result<MutationOutcome, CallQueueError>) -> Response {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(CallQueueError::Validation(_)) => StatusCode::UNPROCESSABLE_ENTITY,
        Err(CallQueueError::Persistence(_)) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ActionEnvelope::from_result(action, &result))).into_response()
}

fn rejected(message: impl Into<String>) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(ActionEnvelope::failure(message)),
    )
        .into_response()
}

fn query_error_response(error: CallQueueError) -> Response {
    match error {
        CallQueueError::Validation(err) => rejected(err.to_string()),
        CallQueueError::Persistence(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "call list unavailable" })),
        )
            .into_response(),
    }
}

pub(crate) async fn list_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Query(params): Query<ListParams>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let filter = match params.into_filter() {
        Ok(filter) => filter,
        Err(err) => return rejected(err.to_string()),
    };

    match run_blocking(move || service.list(&filter)).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(err) => query_error_response(err),
    }
}

pub(crate) async fn summary_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    match run_blocking(move || service.summary()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => query_error_response(err),
    }
}

pub(crate) async fn history_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Path(subject_id): Path<u64>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    match run_blocking(move || service.history(SubjectId(subject_id))).await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(err) => query_error_response(err),
    }
}

pub(crate) async fn enqueue_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    payload: Result<Json<NewCallListEntry>, JsonRejection>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match run_blocking(move || service.enqueue(request)).await {
        Ok(outcome) => {
            let (status, message) = match &outcome {
                EnqueueOutcome::Created(_) => (StatusCode::CREATED, "Client added to call list"),
                EnqueueOutcome::Refreshed(_) => (StatusCode::OK, "Call list entry updated"),
            };
            let body = json!({
                "success": true,
                "message": message,
                "entry": outcome.entry(),
            });
            (status, Json(body)).into_response()
        }
        Err(CallQueueError::Persistence(StoreError::Conflict)) => (
            StatusCode::CONFLICT,
            Json(ActionEnvelope::failure(
                "Client already has an active call list entry",
            )),
        )
            .into_response(),
        Err(CallQueueError::Validation(err)) => rejected(err.to_string()),
        Err(CallQueueError::Persistence(_)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ActionEnvelope::failure(
                "The call list could not be updated. Please try again.",
            )),
        )
            .into_response(),
    }
}

pub(crate) async fn add_note_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
    payload: Result<Json<CallNoteRequest>, JsonRejection>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let (actor, request) = match authorize(&headers, payload) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    let result =
        run_blocking(move || service.add_call_note(actor, SubjectId(subject_id), request)).await;
    action_response(ActionKind::AddCallNote, result)
}

pub(crate) async fn schedule_callback_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
    payload: Result<Json<ScheduleCallbackRequest>, JsonRejection>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let (actor, request) = match authorize(&headers, payload) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    let result =
        run_blocking(move || service.schedule_callback(actor, SubjectId(subject_id), request))
            .await;
    action_response(ActionKind::ScheduleCallback, result)
}

pub(crate) async fn remove_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
    payload: Result<Json<RemoveRequest>, JsonRejection>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let (actor, request) = match authorize(&headers, payload) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    let result =
        run_blocking(move || service.remove_from_list(actor, SubjectId(subject_id), request))
            .await;
    action_response(ActionKind::RemoveFromList, result)
}

pub(crate) async fn assign_handler<L, M, D>(
    State(service): State<SharedService<L, M, D>>,
    Path(subject_id): Path<u64>,
    headers: HeaderMap,
    payload: Result<Json<AssignAgentRequest>, JsonRejection>,
) -> Response
where
    L: CallListLedger + 'static,
    M: MemoLedger + 'static,
    D: SubjectDirectory + AgentDirectory + 'static,
{
    let (actor, request) = match authorize(&headers, payload) {
        Ok(parts) => parts,
        Err(response) => return response,
    };
    let result =
        run_blocking(move || service.assign_agent(actor, SubjectId(subject_id), request)).await;
    action_response(ActionKind::AssignAgent, result)
}

fn authorize<T>(
    headers: &HeaderMap,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<(ActorId, T), Response> {
    let actor = operator_from(headers).map_err(|err| {
        warn!("operator action rejected: missing {OPERATOR_HEADER} header");
        rejected(err.to_string())
    })?;
    let Json(request) = payload.map_err(|rejection| rejected(rejection.body_text()))?;
    Ok((actor, request))
}
