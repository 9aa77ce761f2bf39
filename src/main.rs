use anyhow::Context;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use reach_gateway::auth::SessionKeys;
use reach_gateway::backend::BackendClient;
use reach_gateway::database::{DatabaseManager, PgStore};
use reach_gateway::relay::Relay;
use reach_gateway::state::AppState;
use reach_gateway::{app, config, cors_layer, is_development};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SESSION_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("reach_gateway=info,tower_http=info")),
        )
        .init();

    let config = config::config();
    config.validate().context("invalid configuration")?;
    tracing::info!("Starting Reach gateway in {:?} mode", config.environment);

    let database = DatabaseManager::connect_lazy(&config.database)?;
    if config.database.run_migrations {
        // A missing database should not stop the gateway from serving /health
        if let Err(e) = database.migrate().await {
            tracing::warn!("Skipping migrations: {}", e);
        }
    }

    let store = Arc::new(PgStore::new(&database));
    let state = AppState {
        chats: store.clone(),
        accounts: store.clone(),
        relay: Relay::from_config(&config.backend, store),
        backend: BackendClient::from_config(&config.backend)?,
        keys: SessionKeys::from_config(&config.security)?,
        session_cookie: config.security.session_cookie.clone(),
        default_free_searches: config.billing.default_free_searches,
    };

    let router = app(state)
        .layer(cors_layer(&config.security, is_development!()))
        .layer(TraceLayer::new_for_http());

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Reach gateway listening on http://{}", bind_addr);
    tracing::info!("Relaying research to {}", config.backend.ws_url);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
