//! Tracing setup driven by `LOG_LEVEL` and `DEBUG_MODE`.
//!
//! `RUST_LOG` wins when set, so operators can still override filtering per
//! target without touching the bot config.

use tracing_subscriber::EnvFilter;

pub fn init(log_level: &str, debug_mode: bool) {
    let level = if debug_mode { "debug" } else { log_level };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        // Serenity's gateway is chatty at the bot's debug level; keep it at warn.
        EnvFilter::new(format!("discordeerr={level},serenity=warn,poise=warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .init();
}
