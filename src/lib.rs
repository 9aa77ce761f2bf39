pub mod auth;
pub mod backend;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod relay;
pub mod state;

#[cfg(test)]
pub mod testing;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::SecurityConfig;
use crate::handlers::{account, chat, profile, proxy, research, service, sources};
use crate::middleware::require_session;
use crate::state::AppState;

/// Full router with state attached. CORS and tracing layers are added by the
/// binary so tests exercise the bare routes.
pub fn app(state: AppState) -> Router {
    let protected = Router::new()
        .merge(research_routes())
        .merge(chat_routes())
        .merge(account_routes())
        .merge(config_routes())
        .merge(backend_routes())
        .route("/api/sources-content", post(sources::save_sources_content))
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        // Public
        .route("/", get(service::root))
        .route("/health", get(service::health))
        // Session optional
        .route("/api/user-email", get(account::user_email))
        .route("/api/enterprise-contact", post(sources::enterprise_contact))
        // Session required
        .merge(protected)
        .with_state(state)
}

fn research_routes() -> Router<AppState> {
    Router::new()
        .route("/api/research", post(research::research))
        .route("/api/contract-follow-up", post(research::contract_follow_up))
}

fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/api/save-chat", post(chat::save_chat))
        .route("/api/chats", get(chat::list_chats).delete(chat::clear_chats))
        .route("/api/chats/:id", get(chat::get_chat).delete(chat::delete_chat))
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/free-searches", get(account::free_searches).post(account::consume_free_search))
        .route("/api/user-status", get(account::user_status).post(account::record_search))
        .route("/api/user", post(account::current_user))
}

fn config_routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile", get(profile::get_profile).post(profile::save_profile))
        .route("/api/report-config", get(profile::get_report_config).post(profile::save_report_config))
        .route("/api/chart-config", get(profile::get_chart_config))
        .route("/api/favorite-theme", get(profile::get_favorite_theme).post(profile::set_favorite_theme))
}

fn backend_routes() -> Router<AppState> {
    Router::new()
        .route("/api/condense-reports", post(proxy::condense_reports))
        .route("/api/create-chart", post(proxy::create_chart))
        .route("/api/generate-diagram", post(proxy::generate_diagram))
        .route("/api/generate-presentation", post(proxy::generate_presentation))
        .route(
            "/api/analyze-document",
            post(proxy::analyze_document).layer(DefaultBodyLimit::max(proxy::MAX_DOCUMENT_BYTES)),
        )
}

/// Permissive when `permissive` is set (development), otherwise limited to
/// the configured origins. Disabled entirely when CORS is switched off.
pub fn cors_layer(security: &SecurityConfig, permissive: bool) -> CorsLayer {
    if !security.enable_cors {
        return CorsLayer::new();
    }
    if permissive {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = security
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([HeaderName::from_static(research::CHAT_ID_HEADER)])
        .allow_credentials(true)
}
