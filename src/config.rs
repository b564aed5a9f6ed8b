//! Process-wide configuration, loaded once at startup from the environment.

use crate::error::{BotError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    /// Guild to scope command registration and sync to. Unset means global.
    pub discord_guild_id: Option<u64>,

    pub seerr_url: String,
    pub seerr_api_key: String,

    pub notification_channel_id: u64,

    pub database_path: String,

    pub webhook_host: String,
    pub webhook_port: u16,
    /// Shared secret the inbound `Authorization` header must match.
    /// Unset disables the check entirely (insecure default).
    pub webhook_auth_header: Option<String>,

    pub debug_mode: bool,
    pub log_level: String,
}

impl AppConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            discord_token: require("DISCORD_TOKEN")?,
            discord_guild_id: std::env::var("DISCORD_GUILD_ID")
                .ok()
                .and_then(|s| s.parse().ok()),
            seerr_url: require("SEERR_URL")?.trim_end_matches('/').to_string(),
            seerr_api_key: require("SEERR_API_KEY")?,
            notification_channel_id: require("NOTIFICATION_CHANNEL_ID")?
                .parse::<u64>()
                .ok()
                .filter(|id| *id != 0)
                .ok_or_else(|| BotError::ConfigValidation {
                    message: "NOTIFICATION_CHANNEL_ID must be a non-zero numeric channel ID"
                        .to_string(),
                })?,
            database_path: std::env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "data/links.json".to_string()),
            webhook_host: std::env::var("WEBHOOK_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            webhook_port: std::env::var("WEBHOOK_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            webhook_auth_header: std::env::var("WEBHOOK_AUTH_HEADER")
                .ok()
                .filter(|s| !s.is_empty()),
            debug_mode: std::env::var("DEBUG_MODE")
                .map(|s| s.eq_ignore_ascii_case("true"))
                .unwrap_or(false),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require(name: &str) -> Result<String> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| BotError::ConfigValidation {
            message: format!("{} environment variable is required", name),
        })
}
