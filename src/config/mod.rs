use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub backend: BackendConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub billing: BillingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

/// Where the research backend lives and how hard we try to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub ws_url: String,
    pub http_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// Capacity of the channel between the upstream socket and the HTTP body
    pub relay_buffer: usize,
    /// Directory shared with the backend; generated files are read from here
    pub shared_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
    pub run_migrations: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub session_cookie: String,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingConfig {
    pub default_free_searches: i32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid URL for {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },

    #[error("{key} must use one of: {expected}")]
    InvalidScheme { key: &'static str, expected: &'static str },

    #[error("SESSION_JWT_SECRET is not set")]
    MissingJwtSecret,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Some(port) = env::var("REACH_PORT")
            .ok()
            .or_else(|| env::var("PORT").ok())
            .and_then(|s| s.parse::<u16>().ok())
        {
            self.server.port = port;
        }

        // Backend overrides
        if let Ok(v) = env::var("BACKEND_WS_URL") {
            self.backend.ws_url = v;
        }
        if let Ok(v) = env::var("BACKEND_HTTP_URL").or_else(|_| env::var("PYTHON_SERVER_URL")) {
            self.backend.http_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("BACKEND_CONNECT_TIMEOUT_SECS") {
            self.backend.connect_timeout_secs = v.parse().unwrap_or(self.backend.connect_timeout_secs);
        }
        if let Ok(v) = env::var("BACKEND_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }
        if let Ok(v) = env::var("BACKEND_RELAY_BUFFER") {
            self.backend.relay_buffer = v.parse().unwrap_or(self.backend.relay_buffer).max(1);
        }
        if let Ok(v) = env::var("BACKEND_SHARED_DIR") {
            self.backend.shared_dir = PathBuf::from(v);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }
        if let Ok(v) = env::var("DATABASE_RUN_MIGRATIONS") {
            self.database.run_migrations = v.parse().unwrap_or(self.database.run_migrations);
        }

        // Security overrides
        if let Ok(v) = env::var("SESSION_JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("SESSION_JWT_AUDIENCE") {
            self.security.jwt_audience = v;
        }
        if let Ok(v) = env::var("SESSION_COOKIE") {
            self.security.session_cookie = v;
        }
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(v) = env::var("BILLING_DEFAULT_FREE_SEARCHES") {
            self.billing.default_free_searches = v.parse().unwrap_or(self.billing.default_free_searches);
        }

        self
    }

    /// Checks the settings every request depends on. Called once at startup.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ws = url::Url::parse(&self.backend.ws_url).map_err(|_| ConfigError::InvalidUrl {
            key: "BACKEND_WS_URL",
            value: self.backend.ws_url.clone(),
        })?;
        if !matches!(ws.scheme(), "ws" | "wss") {
            return Err(ConfigError::InvalidScheme { key: "BACKEND_WS_URL", expected: "ws, wss" });
        }

        let http = url::Url::parse(&self.backend.http_url).map_err(|_| ConfigError::InvalidUrl {
            key: "BACKEND_HTTP_URL",
            value: self.backend.http_url.clone(),
        })?;
        if !matches!(http.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidScheme { key: "BACKEND_HTTP_URL", expected: "http, https" });
        }

        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }

        Ok(())
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            backend: BackendConfig {
                ws_url: "ws://localhost:8000/ws".to_string(),
                http_url: "http://localhost:8000".to_string(),
                connect_timeout_secs: 10,
                request_timeout_secs: 300,
                relay_buffer: 64,
                shared_dir: PathBuf::from("."),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout: 30,
                run_migrations: true,
            },
            security: SecurityConfig {
                // Development only; every other environment must set SESSION_JWT_SECRET
                jwt_secret: "reach-development-secret".to_string(),
                jwt_audience: "authenticated".to_string(),
                session_cookie: "sb-access-token".to_string(),
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string(), "http://localhost:5173".to_string()],
            },
            billing: BillingConfig { default_free_searches: 5 },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            backend: BackendConfig {
                ws_url: "ws://backend:8000/ws".to_string(),
                http_url: "http://backend:8000".to_string(),
                connect_timeout_secs: 10,
                request_timeout_secs: 300,
                relay_buffer: 64,
                shared_dir: PathBuf::from("."),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 10,
                run_migrations: true,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                session_cookie: "sb-access-token".to_string(),
                enable_cors: true,
                cors_origins: vec!["https://staging.themagi.systems".to_string()],
            },
            billing: BillingConfig { default_free_searches: 5 },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            backend: BackendConfig {
                ws_url: "ws://backend:8000/ws".to_string(),
                http_url: "http://backend:8000".to_string(),
                connect_timeout_secs: 5,
                request_timeout_secs: 300,
                relay_buffer: 128,
                shared_dir: PathBuf::from("."),
            },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 5,
                run_migrations: false,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_audience: "authenticated".to_string(),
                session_cookie: "sb-access-token".to_string(),
                enable_cors: true,
                cors_origins: vec![
                    "https://themagi.systems".to_string(),
                    "https://www.themagi.systems".to_string(),
                ],
            },
            billing: BillingConfig { default_free_searches: 5 },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_development {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Development)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_defaults_are_valid() {
        let config = AppConfig::development();
        assert!(config.validate().is_ok());
        assert_eq!(config.billing.default_free_searches, 5);
        assert_eq!(config.security.jwt_audience, "authenticated");
    }

    #[test]
    fn production_requires_secret() {
        let config = AppConfig::production();
        assert!(matches!(config.validate(), Err(ConfigError::MissingJwtSecret)));
        assert!(!config.database.run_migrations);
    }

    #[test]
    fn rejects_http_scheme_for_socket_url() {
        let mut config = AppConfig::development();
        config.backend.ws_url = "http://backend:8000/ws".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidScheme { key: "BACKEND_WS_URL", .. })
        ));
    }

    #[test]
    fn rejects_unparseable_backend_url() {
        let mut config = AppConfig::development();
        config.backend.http_url = "not a url".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidUrl { .. })));
    }
}
