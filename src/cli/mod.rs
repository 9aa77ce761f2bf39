pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "reach")]
#[command(about = "Reach CLI - talk to a running Reach gateway")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in human-readable text format")]
    pub text: bool,

    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[arg(long, global = true, env = "REACH_URL", default_value = "http://localhost:3000", help = "Gateway base URL")]
    pub url: String,

    #[arg(long, global = true, env = "REACH_TOKEN", hide_env_values = true, help = "Session token")]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Check gateway and database health")]
    Health,

    #[command(about = "Run a research task and stream the report")]
    Research(commands::research::ResearchArgs),

    #[command(about = "Ask for a revision of contract text and stream the answer")]
    FollowUp(commands::research::FollowUpArgs),

    #[command(about = "Mint a session token with the configured secret (development)")]
    Token(commands::token::TokenArgs),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Where to reach the gateway and as whom
#[derive(Debug, Clone)]
pub struct Target {
    pub base_url: String,
    pub token: Option<String>,
}

impl Target {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn require_token(&self) -> anyhow::Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No session token; pass --token or set REACH_TOKEN (see `reach token`)"))
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let target = Target { base_url: cli.url.clone(), token: cli.token.clone() };

    match cli.command {
        Commands::Health => commands::health::handle(&target, output_format).await,
        Commands::Research(args) => commands::research::research(args, &target, output_format).await,
        Commands::FollowUp(args) => commands::research::follow_up(args, &target, output_format).await,
        Commands::Token(args) => commands::token::handle(args, output_format),
    }
}
