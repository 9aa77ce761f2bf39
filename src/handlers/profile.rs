use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::database::models::{UserConfig, UserConfigPatch};
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, SessionUser};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub job_title: Option<String>,
    pub industry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReportConfigRequest {
    #[serde(default)]
    pub report_config: Value,
}

#[derive(Debug, Deserialize)]
pub struct FavoriteThemeRequest {
    #[serde(alias = "favoriteTheme")]
    pub favorite_theme: Option<String>,
}

async fn load(state: &AppState, user: &SessionUser) -> Result<UserConfig, ApiError> {
    Ok(state.accounts.get_user_config(user.id).await?.unwrap_or_default())
}

async fn save(state: &AppState, user: &SessionUser, patch: UserConfigPatch) -> Result<(), ApiError> {
    state.accounts.upsert_user_config(user.id, patch).await?;
    tracing::debug!("Updated configuration for user {}", user.id);
    Ok(())
}

/// GET /api/profile
pub async fn get_profile(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let config = load(&state, &user).await?;
    Ok(ApiResponse::success(json!({
        "job_title": config.job_title.unwrap_or_default(),
        "industry": config.industry.unwrap_or_default(),
    })))
}

/// POST /api/profile
pub async fn save_profile(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<ProfileRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let patch = UserConfigPatch { job_title: request.job_title, industry: request.industry, ..Default::default() };
    save(&state, &user, patch).await?;
    Ok(ApiResponse::success(json!({ "message": "Profile saved successfully" })))
}

/// GET /api/report-config
pub async fn get_report_config(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let config = load(&state, &user).await?;
    Ok(ApiResponse::success(json!({ "report_config": config.report_config })))
}

/// POST /api/report-config
pub async fn save_report_config(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<ReportConfigRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    if request.report_config.is_null() {
        return Err(ApiError::required("report_config"));
    }
    let patch = UserConfigPatch { report_config: Some(request.report_config), ..Default::default() };
    save(&state, &user, patch).await?;
    Ok(ApiResponse::success(json!({ "message": "Report configuration saved successfully" })))
}

/// GET /api/chart-config
pub async fn get_chart_config(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let config = load(&state, &user).await?;
    let chart_config = config.chart_config.filter(|c| !c.is_null()).unwrap_or_else(|| json!({}));
    Ok(ApiResponse::success(json!({ "chart_config": chart_config })))
}

/// GET /api/favorite-theme
pub async fn get_favorite_theme(State(state): State<AppState>, user: SessionUser) -> ApiResult<Value> {
    let config = load(&state, &user).await?;
    Ok(ApiResponse::success(json!({ "favoriteTheme": config.favorite_theme.unwrap_or_default() })))
}

/// POST /api/favorite-theme
pub async fn set_favorite_theme(
    State(state): State<AppState>,
    user: SessionUser,
    payload: Result<Json<FavoriteThemeRequest>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(request) = payload?;
    let theme = request
        .favorite_theme
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::required("favoriteTheme"))?;
    let patch = UserConfigPatch { favorite_theme: Some(theme.clone()), ..Default::default() };
    save(&state, &user, patch).await?;
    Ok(ApiResponse::success(json!({ "favoriteTheme": theme })))
}
