use clap::Args;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Claims, SessionKeys};
use crate::cli::OutputFormat;
use crate::config;

#[derive(Args)]
pub struct TokenArgs {
    #[arg(long, help = "User id to issue for (random when omitted)")]
    pub user: Option<Uuid>,

    #[arg(long, help = "Email claim")]
    pub email: Option<String>,

    #[arg(long, default_value_t = 24, help = "Lifetime in hours")]
    pub hours: i64,
}

/// Signs with the gateway's own secret, so only useful where the CLI shares
/// the gateway's environment
pub fn handle(args: TokenArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let security = &config::config().security;
    let keys = SessionKeys::from_config(security)?;

    let user = args.user.unwrap_or_else(Uuid::new_v4);
    let claims = Claims::new(user, args.email, keys.audience(), chrono::Duration::hours(args.hours));
    let token = keys.issue(&claims)?;

    match output_format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "user_id": user, "expires_at": claims.exp, "token": token }))?
        ),
        OutputFormat::Text => println!("{}", token),
    }
    Ok(())
}
