use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue},
    response::Response,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::SessionUser;
use crate::relay::{PersistTarget, RelayJob, RelayStream, TaskRequest};
use crate::state::AppState;

pub const CHAT_ID_HEADER: &str = "x-chat-id";
const DEFAULT_REPORT_TYPE: &str = "research_report";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResearchRequest {
    pub id: Option<String>,
    #[serde(default)]
    pub task: String,
    pub report_type: Option<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub edits: Option<String>,
    pub cadence: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowUpRequest {
    #[serde(default)]
    pub selected_text: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub jurisdictions: Vec<String>,
    pub analysis_id: Option<String>,
}

/// POST /api/research - Run a research task and stream the report
///
/// The response body is a sequence of JSON objects, each followed by a blank
/// line, mirroring the backend's `report` and `logs` events. The chat id the
/// report is saved under comes back in `x-chat-id`.
pub async fn research(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<ResearchRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.task.trim().is_empty() {
        return Err(ApiError::required("task"));
    }

    let chat_id = match request.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => id,
        None => Uuid::new_v4().to_string(),
    };
    let chat_header = HeaderValue::from_str(&chat_id).map_err(|_| ApiError::bad_request("Invalid chat id"))?;

    let task = TaskRequest::new(request.task, request.report_type.unwrap_or_else(|| DEFAULT_REPORT_TYPE.into()))
        .with_sources(request.sources)
        .with_edits(request.edits)
        .with_cadence(request.cadence)
        .with_chat_id(chat_id.clone());

    tracing::info!("Starting research for user {} (chat {})", user.id, chat_id);
    let stream = state.relay.start(RelayJob {
        task,
        persist: Some(PersistTarget { chat_id, user_id: user.id }),
    });

    let mut response = stream_response(stream)?;
    response.headers_mut().insert(CHAT_ID_HEADER, chat_header);
    Ok(response)
}

/// POST /api/contract-follow-up - Stream a revision of selected contract text
pub async fn contract_follow_up(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.selected_text.trim().is_empty() {
        return Err(ApiError::required("selectedText"));
    }
    if request.prompt.trim().is_empty() {
        return Err(ApiError::required("prompt"));
    }

    let task = TaskRequest::contract_follow_up(
        &request.selected_text,
        &request.prompt,
        &request.jurisdictions,
        request.analysis_id,
    );

    tracing::info!("Starting contract follow-up for user {}", user.id);
    stream_response(state.relay.start(RelayJob { task, persist: None }))
}

fn stream_response(stream: RelayStream) -> Result<Response, ApiError> {
    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build stream response: {}", e);
            ApiError::internal_server_error("Failed to start stream")
        })
}
