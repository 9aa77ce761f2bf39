use serde_json::{json, Value};

use crate::cli::utils::{output_error, output_success};
use crate::cli::{OutputFormat, Target};

pub async fn handle(target: &Target, output_format: OutputFormat) -> anyhow::Result<()> {
    let response = reqwest::get(target.url("/health")).await?;
    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);

    if status.is_success() {
        output_success(
            &output_format,
            &format!("{} is healthy", target.base_url),
            Some(json!({ "health": body["data"] })),
        )
    } else {
        let reason = body["data"]["database_error"].as_str().unwrap_or("unknown error");
        output_error(
            &output_format,
            &format!("{} is degraded ({}): {}", target.base_url, status, reason),
            Some("SERVICE_UNAVAILABLE"),
        )?;
        anyhow::bail!("gateway unhealthy")
    }
}
