use clap::Args;
use futures::StreamExt;
use serde_json::{json, Value};
use std::io::Write;

use crate::cli::utils::{output_error, ChunkDecoder};
use crate::cli::{OutputFormat, Target};

#[derive(Args)]
pub struct ResearchArgs {
    #[arg(help = "What to research")]
    pub task: String,

    #[arg(long, default_value = "research_report", help = "Backend report type")]
    pub report_type: String,

    #[arg(long = "source", help = "Source selector, repeatable (e.g. WEB)")]
    pub sources: Vec<String>,

    #[arg(long, help = "Chat id to save under (generated when omitted)")]
    pub chat_id: Option<String>,

    #[arg(long, help = "Also print backend progress logs to stderr")]
    pub logs: bool,
}

#[derive(Args)]
pub struct FollowUpArgs {
    #[arg(long = "selected-text", help = "Contract text to revise")]
    pub selected_text: String,

    #[arg(long, help = "What to change")]
    pub prompt: String,

    #[arg(long = "jurisdiction", help = "Governing jurisdiction, repeatable")]
    pub jurisdictions: Vec<String>,

    #[arg(long, help = "Also print backend progress logs to stderr")]
    pub logs: bool,
}

pub async fn research(args: ResearchArgs, target: &Target, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = json!({
        "id": args.chat_id,
        "task": args.task,
        "reportType": args.report_type,
        "sources": args.sources,
    });
    stream(target, "/api/research", body, args.logs, output_format).await
}

pub async fn follow_up(args: FollowUpArgs, target: &Target, output_format: OutputFormat) -> anyhow::Result<()> {
    let body = json!({
        "selectedText": args.selected_text,
        "prompt": args.prompt,
        "jurisdictions": args.jurisdictions,
    });
    stream(target, "/api/contract-follow-up", body, args.logs, output_format).await
}

/// POST `body` and print report output as it streams in. JSON output prints
/// every event on its own line instead.
async fn stream(target: &Target, path: &str, body: Value, logs: bool, output_format: OutputFormat) -> anyhow::Result<()> {
    let response = reqwest::Client::new()
        .post(target.url(path))
        .bearer_auth(target.require_token()?)
        .json(&body)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"].as_str().unwrap_or("request failed");
        output_error(&output_format, &format!("{} ({})", message, status), body["code"].as_str())?;
        anyhow::bail!("{} returned {}", path, status);
    }

    if let Some(chat_id) = response.headers().get("x-chat-id").and_then(|v| v.to_str().ok()) {
        eprintln!("chat: {}", chat_id);
    }

    let mut decoder = ChunkDecoder::default();
    let mut bytes = response.bytes_stream();
    let mut stdout = std::io::stdout();
    while let Some(chunk) = bytes.next().await {
        for event in decoder.push(&chunk?) {
            match output_format {
                OutputFormat::Json => println!("{}", event),
                OutputFormat::Text => match event["type"].as_str() {
                    Some("report") => {
                        print!("{}", event["output"].as_str().unwrap_or_default());
                        stdout.flush()?;
                    }
                    Some("logs") if logs => eprintln!("{}", event["output"].as_str().unwrap_or_default()),
                    _ => {}
                },
            }
        }
    }

    if matches!(output_format, OutputFormat::Text) {
        println!();
    }
    Ok(())
}
