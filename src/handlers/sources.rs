use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use crate::database::models::{ContactRequest, SourceContent};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, MaybeSession, SessionUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcesContentRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub content: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct EnterpriseContactRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub company: Option<String>,
}

/// Hex SHA-256 of scraped page content
pub fn content_hash(content: &str) -> String {
    Sha256::digest(content.as_bytes()).iter().map(|b| format!("{:02x}", b)).collect()
}

/// POST /api/sources-content - Store the raw text scraped for each source URL
///
/// `sources[i]` is the URL `content[i]` was scraped from.
pub async fn save_sources_content(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<SourcesContentRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.chat_id.trim().is_empty() {
        return Err(ApiError::required("chatId"));
    }
    if request.sources.len() != request.content.len() {
        return Err(ApiError::bad_request(format!(
            "sources and content must have the same length ({} != {})",
            request.sources.len(),
            request.content.len()
        )));
    }

    let rows = request
        .sources
        .into_iter()
        .zip(request.content)
        .map(|(source_url, content)| SourceContent { content_hash: content_hash(&content), source_url, content })
        .collect();

    let inserted = state.accounts.insert_source_contents(user.id, &request.chat_id, rows).await?;
    tracing::info!("Saved {} sources for chat {}", inserted, request.chat_id);
    Ok(ApiResponse::created(json!({ "inserted": inserted })))
}

/// POST /api/enterprise-contact - Enterprise enquiry / waitlist signup
///
/// Works without a session; the user id is attached when there is one.
pub async fn enterprise_contact(
    State(state): State<AppState>,
    session: MaybeSession,
    payload: Result<Json<EnterpriseContactRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.name.trim().is_empty() {
        return Err(ApiError::required("name"));
    }
    if request.email.trim().is_empty() {
        return Err(ApiError::required("email"));
    }

    state
        .accounts
        .insert_contact(ContactRequest {
            name: request.name,
            email: request.email,
            company: request.company.filter(|c| !c.trim().is_empty()),
            user_id: session.0.map(|user| user.id),
        })
        .await?;

    Ok(ApiResponse::created(json!({ "message": "Contact information submitted successfully" })))
}
