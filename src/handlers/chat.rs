use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{ChatMessage, ChatRecord};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveChatRequest {
    #[serde(default)]
    pub chat_id: String,
    #[serde(default)]
    pub completion: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub is_newsletter: bool,
    pub cadence: Option<String>,
}

/// POST /api/save-chat - Append an assistant completion and upsert the chat
///
/// The chat is titled from its first message and the completion is indexed
/// after the prior messages.
pub async fn save_chat(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<SaveChatRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.chat_id.trim().is_empty() {
        return Err(ApiError::required("chatId"));
    }
    if request.messages.is_empty() {
        return Err(ApiError::required("messages"));
    }

    let mut record =
        ChatRecord::with_completion(request.chat_id, user.id, request.messages, request.completion, Utc::now());
    if request.is_newsletter {
        record = record.newsletter(request.cadence);
    }
    state.chats.upsert_chat(&record).await?;

    Ok(ApiResponse::success(json!({
        "message": "Chat history saved successfully",
        "chatId": record.id,
    })))
}

/// GET /api/chats - The user's chat history, newest first
///
/// Newsletter chats and payloads the history list cannot render are left out.
pub async fn list_chats(State(state): State<AppState>, user: SessionUser) -> ApiResult<Vec<Value>> {
    let chats = state.chats.list_chats(user.id).await?;
    let payloads = chats
        .into_iter()
        .filter(ChatRecord::is_renderable)
        .map(|record| record.payload)
        .collect();
    Ok(ApiResponse::success(payloads))
}

/// GET /api/chats/:id
pub async fn get_chat(
    State(state): State<AppState>,
    user: SessionUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Value> {
    let record = state
        .chats
        .get_chat(user.id, &chat_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Chat '{}' not found", chat_id)))?;
    Ok(ApiResponse::success(record.payload))
}

/// DELETE /api/chats/:id
pub async fn delete_chat(
    State(state): State<AppState>,
    user: SessionUser,
    Path(chat_id): Path<String>,
) -> ApiResult<Value> {
    if !state.chats.delete_chat(user.id, &chat_id).await? {
        return Err(ApiError::not_found(format!("Chat '{}' not found", chat_id)));
    }
    Ok(ApiResponse::success(json!({ "deleted": chat_id })))
}

/// DELETE /api/chats - Remove every chat the user owns
pub async fn clear_chats(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let deleted = state.chats.clear_chats(user.id).await?;
    tracing::info!("Cleared {} chats for user {}", deleted, user.id);
    Ok(ApiResponse::success(json!({ "deleted": deleted })))
}
