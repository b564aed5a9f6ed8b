//! Admin commands over the link store and the command table.
//!
//! Every command here re-verifies the invoker's Seerr admin privilege with
//! a fresh API round-trip; nothing is cached, since privilege can be
//! revoked upstream between invocations.

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::{Context, Error};

const COLOR_BLUE: u32 = 0x3498DB;
const COLOR_GREEN: u32 = 0x2ECC71;
const COLOR_ORANGE: u32 = 0xE67E22;
const COLOR_RED: u32 = 0xE74C3C;

/// Deny the command unless the invoker is linked to a Seerr admin account.
/// Callers must have deferred already; the denial reply is a followup.
async fn ensure_admin(ctx: &Context<'_>) -> Result<bool, Error> {
    let discord_id = ctx.author().id.to_string();
    let allowed = match ctx.data().admin_gate.verify_admin(&discord_id).await {
        Ok(allowed) => allowed,
        Err(e) => {
            warn!("Admin check for {} failed: {}", discord_id, e);
            false
        }
    };

    if !allowed {
        ctx.send(
            poise::CreateReply::default()
                .content(
                    "You need to be a Seerr admin to use admin commands. \
                     Contact a server administrator.",
                )
                .ephemeral(true),
        )
        .await?;
    }
    Ok(allowed)
}

fn valid_discord_id(s: &str) -> bool {
    s.len() >= 17 && s.chars().all(|c| c.is_ascii_digit())
}

async fn reply_embed(ctx: &Context<'_>, embed: serenity::CreateEmbed) -> Result<(), Error> {
    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;
    Ok(())
}

async fn reject_invalid_discord_id(ctx: &Context<'_>) -> Result<(), Error> {
    reply_embed(
        ctx,
        serenity::CreateEmbed::new()
            .title("Invalid Discord ID")
            .description("Discord ID must be a numeric value with at least 17 digits.")
            .color(COLOR_RED),
    )
    .await
}

/// Check bot health and configuration
#[poise::command(slash_command)]
pub async fn health(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let seerr_status = if ctx.data().seerr.test_connection().await {
        "Connected"
    } else {
        "Disconnected"
    };
    let link_count = ctx.data().links.link_count().await;
    let latency = ctx.ping().await;

    let embed = serenity::CreateEmbed::new()
        .title("Bot Status")
        .description("Current bot configuration and status")
        .field("Seerr API", seerr_status, true)
        .field("Linked Accounts", link_count.to_string(), true)
        .field("Bot Latency", format!("{}ms", latency.as_millis()), true)
        .field(
            "Notification Channel",
            format!("<#{}>", ctx.data().config.notification_channel_id),
            true,
        )
        .color(COLOR_BLUE);

    reply_embed(&ctx, embed).await
}

/// List all linked users and their Seerr accounts
#[poise::command(slash_command)]
pub async fn users(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let links = ctx.data().links.list_links().await;

    if links.is_empty() {
        return reply_embed(
            &ctx,
            serenity::CreateEmbed::new()
                .title("No Linked Users")
                .description("No users have linked their accounts yet.")
                .color(COLOR_BLUE),
        )
        .await;
    }

    let mut embed = serenity::CreateEmbed::new()
        .title("Linked Users")
        .description(format!("**{}** user(s) linked to Seerr", links.len()))
        .color(COLOR_BLUE);

    for link in links.iter().take(10) {
        embed = embed
            .field("Seerr Username", &link.seerr_username, true)
            .field("Discord User", format!("<@{}>", link.discord_id), true)
            .field(
                "Linked",
                format!("<t:{}:R>", link.linked_at.timestamp()),
                true,
            );
    }

    embed = if links.len() > 10 {
        embed.footer(serenity::CreateEmbedFooter::new(format!(
            "Showing 10 of {} users",
            links.len()
        )))
    } else {
        embed.footer(serenity::CreateEmbedFooter::new("All linked users shown"))
    };

    reply_embed(&ctx, embed).await
}

/// Force link a Discord member to a Seerr account
#[poise::command(slash_command, guild_only, rename = "force-link-member")]
pub async fn force_link_member(
    ctx: Context<'_>,
    #[description = "The Discord member to link"] user: serenity::Member,
    #[description = "The Seerr user ID to link them to"] seerr_user_id: i64,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    if seerr_user_id <= 0 {
        return reply_embed(
            &ctx,
            serenity::CreateEmbed::new()
                .title("Invalid Input")
                .description("Seerr user ID must be a positive number.")
                .color(COLOR_RED),
        )
        .await;
    }

    let seerr_user = match ctx.data().seerr.get_user(seerr_user_id as u64).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("Seerr User Not Found")
                    .description(format!("Seerr user with ID {} was not found.", seerr_user_id))
                    .color(COLOR_RED),
            )
            .await;
        }
        Err(e) => {
            error!("Error in force-link-member command: {}", e);
            return reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("Error")
                    .description("An error occurred while force linking the account.")
                    .color(COLOR_RED),
            )
            .await;
        }
    };

    let seerr_username = seerr_user.resolved_username();
    let discord_id = user.user.id.to_string();

    match ctx
        .data()
        .links
        .force_link(&discord_id, seerr_user.id, &seerr_username)
        .await
    {
        Ok((_, displaced)) => {
            info!(
                "Admin {} force-linked Discord member {} to Seerr user {}",
                ctx.author().id,
                discord_id,
                seerr_user.id
            );
            reply_embed(&ctx, force_link_success(&seerr_username, &displaced)).await
        }
        Err(e) => {
            error!("Error in force-link-member command: {}", e);
            reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("Force Link Failed")
                    .description("Failed to link the account. Please try again.")
                    .color(COLOR_RED),
            )
            .await
        }
    }
}

/// Force link a Seerr account to a Discord ID
#[poise::command(slash_command, rename = "force-link")]
pub async fn force_link(
    ctx: Context<'_>,
    #[description = "The Seerr username to link"] seerr_username: String,
    #[description = "The Discord ID to link to"] discord_id: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    if seerr_username.trim().is_empty() {
        return reply_embed(
            &ctx,
            serenity::CreateEmbed::new()
                .title("Invalid Input")
                .description("Seerr username cannot be empty.")
                .color(COLOR_RED),
        )
        .await;
    }
    if !valid_discord_id(&discord_id) {
        return reject_invalid_discord_id(&ctx).await;
    }

    let seerr_user = match ctx.data().seerr.find_user_by_username(&seerr_username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("User Not Found")
                    .description(format!("Seerr user '{}' was not found.", seerr_username))
                    .color(COLOR_RED),
            )
            .await;
        }
        Err(e) => {
            error!("Error in force-link command: {}", e);
            return reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("Error")
                    .description("An error occurred while force-linking the account.")
                    .color(COLOR_RED),
            )
            .await;
        }
    };

    let resolved_username = seerr_user.resolved_username();

    match ctx
        .data()
        .links
        .force_link(&discord_id, seerr_user.id, &resolved_username)
        .await
    {
        Ok((_, displaced)) => {
            info!(
                "Admin {} force-linked Seerr user {} to Discord ID {}",
                ctx.author().id,
                seerr_user.id,
                discord_id
            );
            reply_embed(&ctx, force_link_success(&resolved_username, &displaced)).await
        }
        Err(e) => {
            error!("Error in force-link command: {}", e);
            reply_embed(
                &ctx,
                serenity::CreateEmbed::new()
                    .title("Force-Linking Failed")
                    .description("Failed to force-link the account. Please try again.")
                    .color(COLOR_RED),
            )
            .await
        }
    }
}

fn force_link_success(
    seerr_username: &str,
    displaced: &[crate::state::Link],
) -> serenity::CreateEmbed {
    let mut embed = serenity::CreateEmbed::new()
        .title("Force Link Successful")
        .description(format!(
            "Seerr user **{}** has been force-linked.",
            seerr_username
        ))
        .color(COLOR_GREEN);

    if !displaced.is_empty() {
        let takeovers = displaced
            .iter()
            .map(|old| format!("<@{}> (was **{}**)", old.discord_id, old.seerr_username))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field("Previous links removed", takeovers, false);
    }
    embed
}

/// Unlink a Discord member from their Seerr account
#[poise::command(slash_command, guild_only, rename = "unlink-member")]
pub async fn unlink_member(
    ctx: Context<'_>,
    #[description = "The Discord member to unlink"] user: serenity::Member,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let discord_id = user.user.id.to_string();
    unlink_by_id(&ctx, &discord_id, &format!("<@{}>", discord_id)).await
}

/// Unlink a Discord user from their Seerr account
#[poise::command(slash_command, rename = "unlink-user")]
pub async fn unlink_user(
    ctx: Context<'_>,
    #[description = "The Discord ID to unlink"] discord_id: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    if !valid_discord_id(&discord_id) {
        return reject_invalid_discord_id(&ctx).await;
    }

    unlink_by_id(&ctx, &discord_id, &format!("`{}`", discord_id)).await
}

async fn unlink_by_id(ctx: &Context<'_>, discord_id: &str, label: &str) -> Result<(), Error> {
    match ctx.data().links.unlink(discord_id).await {
        Ok(Some(removed)) => {
            info!(
                "Admin {} unlinked Discord ID {} from Seerr user {}",
                ctx.author().id,
                discord_id,
                removed.seerr_user_id
            );
            reply_embed(
                ctx,
                serenity::CreateEmbed::new()
                    .title("Unlink Successful")
                    .description(format!(
                        "{} has been unlinked from Seerr user: **{}**",
                        label, removed.seerr_username
                    ))
                    .color(COLOR_GREEN),
            )
            .await
        }
        Ok(None) => {
            reply_embed(
                ctx,
                serenity::CreateEmbed::new()
                    .title("No Linked Account")
                    .description(format!("{} doesn't have a linked Seerr account.", label))
                    .color(COLOR_BLUE),
            )
            .await
        }
        Err(e) => {
            error!("Error unlinking {}: {}", discord_id, e);
            reply_embed(
                ctx,
                serenity::CreateEmbed::new()
                    .title("Unlink Failed")
                    .description("Failed to unlink the account. Please try again.")
                    .color(COLOR_RED),
            )
            .await
        }
    }
}

/// Check if a Discord ID is linked and list any link conflicts
#[poise::command(slash_command, rename = "check-discord-id")]
pub async fn check_discord_id(
    ctx: Context<'_>,
    #[description = "The Discord ID to check"] discord_id: String,
) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    if !valid_discord_id(&discord_id) {
        return reject_invalid_discord_id(&ctx).await;
    }

    let linked = ctx.data().links.find_by_discord_id(&discord_id).await;
    let conflicts = ctx.data().links.find_conflicts().await;

    let mut embed = serenity::CreateEmbed::new()
        .title("Discord ID Check")
        .description(format!("Checking Discord ID: `{}`", discord_id))
        .color(COLOR_BLUE);

    match linked {
        Some(link) => {
            embed = embed
                .field("Status", "Linked", true)
                .field("Seerr User", &link.seerr_username, true)
                .field("Seerr User ID", link.seerr_user_id.to_string(), true)
                .field(
                    "Linked At",
                    format!("<t:{}:R>", link.linked_at.timestamp()),
                    true,
                );
        }
        None => {
            embed = embed.field("Status", "Not Linked", true).field(
                "Note",
                "This Discord ID is not linked to any Seerr account",
                false,
            );
        }
    }

    if !conflicts.is_empty() {
        let listing = conflicts
            .iter()
            .map(|(id, username)| format!("<@{}> -> **{}**", id, username))
            .collect::<Vec<_>>()
            .join("\n");
        embed = embed.field(
            "Link Conflicts Detected",
            format!("{}\n\nUse `/force-link` or `/unlink-user` to resolve.", listing),
            false,
        );
        embed = embed.color(COLOR_ORANGE);
    }

    reply_embed(&ctx, embed).await
}

/// Sync bot commands with Discord
#[poise::command(slash_command)]
pub async fn sync(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let commands = &ctx.framework().options.commands;
    let sync_type = match ctx.data().config.discord_guild_id {
        Some(guild_id) => {
            poise::builtins::register_in_guild(
                ctx.http(),
                commands,
                serenity::GuildId::new(guild_id),
            )
            .await?;
            format!("to guild {}", guild_id)
        }
        None => {
            poise::builtins::register_globally(ctx.http(), commands).await?;
            "globally".to_string()
        }
    };

    info!("Admin {} synced commands {}", ctx.author().id, sync_type);
    reply_embed(
        &ctx,
        serenity::CreateEmbed::new()
            .title("Commands Synced")
            .description(format!("Commands have been synced {} successfully!", sync_type))
            .color(COLOR_GREEN),
    )
    .await
}

/// Completely reset all commands
#[poise::command(slash_command, rename = "reset-commands")]
pub async fn reset_commands(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;
    if !ensure_admin(&ctx).await? {
        return Ok(());
    }

    let commands = &ctx.framework().options.commands;
    let reset_type = match ctx.data().config.discord_guild_id {
        Some(guild_id) => {
            let guild = serenity::GuildId::new(guild_id);
            guild.set_commands(ctx.http(), Vec::new()).await?;
            poise::builtins::register_in_guild(ctx.http(), commands, guild).await?;
            format!("for guild {}", guild_id)
        }
        None => {
            serenity::Command::set_global_commands(ctx.http(), Vec::new()).await?;
            poise::builtins::register_globally(ctx.http(), commands).await?;
            "globally".to_string()
        }
    };

    info!("Admin {} reset commands {}", ctx.author().id, reset_type);
    reply_embed(
        &ctx,
        serenity::CreateEmbed::new()
            .title("Commands Reset")
            .description(format!("All commands have been completely reset {}!", reset_type))
            .color(COLOR_GREEN),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_discord_id() {
        assert!(valid_discord_id("123456789012345678"));
        assert!(valid_discord_id("12345678901234567"));
        assert!(!valid_discord_id("1234567890123456"));
        assert!(!valid_discord_id("12345678901234567a"));
        assert!(!valid_discord_id(""));
        assert!(!valid_discord_id("not-an-id"));
    }
}
