//! HTTP client for the research backend's request/response endpoints.

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::config::BackendConfig;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("research backend responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("research backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("research backend returned an unreadable body: {0}")]
    Decode(String),

    #[error("generated file {path} is not readable: {source}")]
    MissingFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    shared_dir: PathBuf,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url, shared_dir: PathBuf::from(".") })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        Ok(Self::new(config.http_url.clone(), Duration::from_secs(config.request_timeout_secs))?
            .with_shared_dir(config.shared_dir.clone()))
    }

    pub fn with_shared_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.shared_dir = dir.into();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POST /condense-findings
    pub async fn condense_findings(&self, task: &str, accumulated_output: &str) -> Result<Value, BackendError> {
        self.post_json("/condense-findings", &json!({ "task": task, "accumulatedOutput": accumulated_output }))
            .await
    }

    /// POST /create-chart
    pub async fn create_chart(&self, table_id: &str, table_content: &str) -> Result<Value, BackendError> {
        self.post_json("/create-chart", &json!({ "tableId": table_id, "tableContent": table_content }))
            .await
    }

    /// POST /generate-diagram, returning the rendered PNG
    pub async fn generate_diagram(&self, content: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .http
            .post(self.url("/generate-diagram"))
            .json(&json!({ "content": content }))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// POST /generate-powerpoint, returning the deck's bytes
    ///
    /// The backend writes the deck into the shared directory and answers with
    /// its `file_path` relative to that directory.
    pub async fn generate_powerpoint(&self, prompt: &str) -> Result<Vec<u8>, BackendError> {
        let result = self.post_json("/generate-powerpoint", &json!({ "prompt": prompt })).await?;
        let file_path = result["file_path"]
            .as_str()
            .ok_or_else(|| BackendError::Decode("missing file_path".to_string()))?;

        let path = self.shared_dir.join(file_path.trim_start_matches('/'));
        tokio::fs::read(&path)
            .await
            .map_err(|source| BackendError::MissingFile { path: path.display().to_string(), source })
    }

    /// POST /process-pdf with the raw document bytes
    pub async fn process_pdf(&self, filename: &str, bytes: Vec<u8>) -> Result<Value, BackendError> {
        let response = self
            .http
            .post(self.url("/process-pdf"))
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename.replace('"', "")))
            .body(bytes)
            .send()
            .await?;
        decode_json(check_status(response).await?).await
    }

    async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Value, BackendError> {
        tracing::debug!("POST {}{}", self.base_url, path);
        let response = self.http.post(self.url(path)).json(body).send().await?;
        decode_json(check_status(response).await?).await
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!("Research backend responded with {}: {}", status, body);
    Err(BackendError::Status { status: status.as_u16(), body })
}

async fn decode_json(response: reqwest::Response) -> Result<Value, BackendError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| BackendError::Decode(e.to_string()))
}
