use axum::{
    extract::{rejection::JsonRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::state::AppState;

/// Largest document accepted by /api/analyze-document
pub const MAX_DOCUMENT_BYTES: usize = 25 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CondenseRequest {
    #[serde(default)]
    pub task: String,
    #[serde(default)]
    pub accumulated_output: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRequest {
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub table_content: String,
}

#[derive(Debug, Deserialize)]
pub struct DiagramRequest {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PresentationRequest {
    #[serde(default)]
    pub prompt: String,
}

const PPTX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

fn require(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::required(field));
    }
    Ok(())
}

/// POST /api/condense-reports - Condense accumulated findings via the backend
pub async fn condense_reports(
    State(state): State<AppState>,
    _user: SessionUser,
    payload: Result<Json<CondenseRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    require(&request.task, "task")?;
    require(&request.accumulated_output, "accumulatedOutput")?;

    let result = state.backend.condense_findings(&request.task, &request.accumulated_output).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/create-chart - Chart spec for a report table
pub async fn create_chart(
    State(state): State<AppState>,
    _user: SessionUser,
    payload: Result<Json<ChartRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    require(&request.table_id, "tableId")?;
    require(&request.table_content, "tableContent")?;

    let result = state.backend.create_chart(&request.table_id, &request.table_content).await?;
    Ok(ApiResponse::success(result))
}

/// POST /api/generate-diagram - Rendered PNG, served as a download
pub async fn generate_diagram(
    State(state): State<AppState>,
    _user: SessionUser,
    payload: Result<Json<DiagramRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    require(&request.content, "content")?;

    let png = state.backend.generate_diagram(&request.content).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"generated_diagram.png\""),
        ],
        png,
    )
        .into_response())
}

/// POST /api/generate-presentation - PowerPoint deck, served as a download
pub async fn generate_presentation(
    State(state): State<AppState>,
    _user: SessionUser,
    payload: Result<Json<PresentationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    require(&request.prompt, "prompt")?;

    let deck = state.backend.generate_powerpoint(&request.prompt).await?;
    tracing::info!("Serving generated presentation ({} bytes)", deck.len());
    Ok((
        [
            (header::CONTENT_TYPE, PPTX_CONTENT_TYPE),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"generated_presentation.pptx\""),
        ],
        deck,
    )
        .into_response())
}

/// POST /api/analyze-document - Forward an uploaded document for analysis
///
/// Expects multipart form data with a `file` part.
pub async fn analyze_document(
    State(state): State<AppState>,
    _user: SessionUser,
    mut multipart: Multipart,
) -> ApiResult<Value> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read file: {}", e)))?;
        tracing::info!("Forwarding document '{}' ({} bytes) for analysis", filename, bytes.len());

        let result = state.backend.process_pdf(&filename, bytes.to_vec()).await?;
        return Ok(ApiResponse::success(result));
    }

    Err(ApiError::required("file"))
}
