use poise::serenity_prelude as serenity;
use tracing::info;

use crate::{Context, Error};

/// Check if the bot is running
#[poise::command(slash_command)]
pub async fn ping(ctx: Context<'_>) -> Result<(), Error> {
    info!("Ping command called by {}", ctx.author().name);
    let latency = ctx.ping().await;
    ctx.send(
        poise::CreateReply::default()
            .content(format!("Pong! Gateway latency: {}ms", latency.as_millis()))
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Show help information
#[poise::command(slash_command)]
pub async fn help(ctx: Context<'_>) -> Result<(), Error> {
    let embed = serenity::CreateEmbed::new()
        .title("Bot Commands")
        .description("Available commands:")
        .field("/link-account", "Link your Discord account to your Seerr account", false)
        .field("/unlink-account", "Unlink your Discord account from Seerr", false)
        .field("/status", "Check your account status and request statistics", false)
        .field("/ping", "Check if the bot is running", false)
        .field(
            "Admin",
            "/health, /users, /force-link-member, /unlink-member, /force-link, \
             /unlink-user, /check-discord-id, /sync, /reset-commands",
            false,
        )
        .color(0x3498DB);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}
