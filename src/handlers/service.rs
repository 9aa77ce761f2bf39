use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - Service name, version and endpoint index
pub async fn root() -> Json<Value> {
    Json(json!({
        "success": true,
        "data": {
            "name": "Reach Gateway",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Sessions, chat history and streaming research relay",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "research": "/api/research, /api/contract-follow-up (streaming)",
                "chats": "/api/save-chat, /api/chats[/:id]",
                "account": "/api/free-searches, /api/user-status, /api/user-email, /api/user",
                "config": "/api/profile, /api/report-config, /api/chart-config, /api/favorite-theme",
                "sources": "/api/sources-content, /api/enterprise-contact",
                "backend": "/api/condense-reports, /api/create-chart, /api/generate-diagram, /api/generate-presentation, /api/analyze-document",
            }
        }
    }))
}

/// GET /health - 200 when the database answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.accounts.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "database unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                }
            })),
        ),
    }
}
