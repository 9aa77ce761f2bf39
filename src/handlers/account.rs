use axum::extract::State;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, MaybeSession, SessionUser};
use crate::state::AppState;

/// GET /api/free-searches - Remaining free searches
pub async fn free_searches(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let remaining = state
        .accounts
        .get_account(user.id)
        .await?
        .and_then(|account| account.free_searches_remaining)
        .unwrap_or(state.default_free_searches);
    Ok(ApiResponse::success(json!({ "freeSearches": remaining })))
}

/// POST /api/free-searches - Spend one free search
pub async fn consume_free_search(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let remaining = consume(&state, &user).await?;
    Ok(ApiResponse::success(json!({ "freeSearches": remaining })))
}

/// GET /api/user-status - Pro flag, or the free search balance for everyone else
pub async fn user_status(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let account = state.accounts.get_account(user.id).await?;
    if account.as_ref().map(|a| a.is_pro()).unwrap_or(false) {
        return Ok(ApiResponse::success(json!({ "isPro": true })));
    }

    let remaining = account
        .and_then(|a| a.free_searches_remaining)
        .unwrap_or(state.default_free_searches);
    Ok(ApiResponse::success(json!({ "isPro": false, "freeSearches": remaining })))
}

/// POST /api/user-status - Record a search: pro users are unmetered, others
/// spend a free search
pub async fn record_search(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let account = state
        .accounts
        .get_account(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    if account.is_pro() {
        return Ok(ApiResponse::success(json!({ "isPro": true })));
    }

    let remaining = consume(&state, &user).await?;
    Ok(ApiResponse::success(json!({ "isPro": false, "freeSearches": remaining })))
}

async fn consume(state: &AppState, user: &SessionUser) -> Result<i32, ApiError> {
    let remaining = state
        .accounts
        .consume_free_search(user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;
    tracing::debug!("User {} has {} free searches left", user.id, remaining);
    Ok(remaining)
}

/// GET /api/user-email - Email of the signed-in user, `null` when anonymous
pub async fn user_email(session: MaybeSession) -> ApiResponse<Value> {
    let email = session.0.and_then(|user| user.email);
    ApiResponse::success(json!({ "email": email }))
}

/// POST /api/user - The session's user
pub async fn current_user(user: SessionUser) -> ApiResponse<Value> {
    ApiResponse::success(json!({ "user": { "id": user.id, "email": user.email } }))
}

#[cfg(test)]
mod tests {
    use crate::database::models::Account;
    use crate::testing::{bearer, call_json, offline_state, request, MemoryStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use uuid::Uuid;

    fn app_with(account: Option<Account>) -> axum::Router {
        let store = match account {
            Some(account) => MemoryStore::default().with_account(account),
            None => MemoryStore::default(),
        };
        crate::app(offline_state(Arc::new(store)))
    }

    fn account(id: Uuid, free: Option<i32>, status: Option<&str>) -> Account {
        Account { id, free_searches_remaining: free, subscription_status: status.map(str::to_string) }
    }

    #[tokio::test]
    async fn free_searches_default_when_user_row_missing() {
        let app = app_with(None);
        let (status, body) = call_json(app, request("GET", "/api/free-searches", Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["freeSearches"], 5);
    }

    #[tokio::test]
    async fn consuming_free_searches_stops_at_zero() {
        let user = Uuid::new_v4();
        let app = app_with(Some(account(user, Some(1), None)));

        let (_, body) = call_json(app.clone(), request("POST", "/api/free-searches", Some(user), None)).await;
        assert_eq!(body["data"]["freeSearches"], 0);
        let (_, body) = call_json(app, request("POST", "/api/free-searches", Some(user), None)).await;
        assert_eq!(body["data"]["freeSearches"], 0);
    }

    #[tokio::test]
    async fn consuming_without_user_row_is_not_found() {
        let app = app_with(None);
        let (status, _) = call_json(app, request("POST", "/api/free-searches", Some(Uuid::new_v4()), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn pro_users_are_not_metered() {
        let user = Uuid::new_v4();
        let app = app_with(Some(account(user, Some(3), Some("active"))));

        let (status, body) = call_json(app.clone(), request("POST", "/api/user-status", Some(user), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], serde_json::json!({ "isPro": true }));

        let (_, body) = call_json(app, request("GET", "/api/free-searches", Some(user), None)).await;
        assert_eq!(body["data"]["freeSearches"], 3);
    }

    #[tokio::test]
    async fn free_users_spend_a_search_on_status_post() {
        let user = Uuid::new_v4();
        let app = app_with(Some(account(user, Some(2), Some("canceled"))));

        let (_, body) = call_json(app.clone(), request("GET", "/api/user-status", Some(user), None)).await;
        assert_eq!(body["data"]["isPro"], false);
        assert_eq!(body["data"]["freeSearches"], 2);

        let (_, body) = call_json(app, request("POST", "/api/user-status", Some(user), None)).await;
        assert_eq!(body["data"]["freeSearches"], 1);
    }

    #[tokio::test]
    async fn user_email_is_null_for_anonymous_requests() {
        let app = app_with(None);
        let (status, body) = call_json(app.clone(), request("GET", "/api/user-email", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["email"].is_null());

        let (_, body) = call_json(app.clone(), request("GET", "/api/user-email", Some(Uuid::new_v4()), None)).await;
        assert_eq!(body["data"]["email"], "analyst@example.com");

        let forged = Request::get("/api/user-email")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let (status, body) = call_json(app, forged).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"]["email"].is_null());
    }

    #[tokio::test]
    async fn session_cookie_is_accepted() {
        let user = Uuid::new_v4();
        let token = bearer(user, None).trim_start_matches("Bearer ").to_string();
        let req = Request::post("/api/user")
            .header("cookie", format!("sb-access-token={}", token))
            .body(Body::empty())
            .unwrap();

        let (status, body) = call_json(app_with(None), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["id"], user.to_string());
    }
}
