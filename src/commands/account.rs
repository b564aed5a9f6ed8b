//! Self-service account linking commands.

use poise::serenity_prelude as serenity;
use tracing::{error, info, warn};

use crate::error::BotError;
use crate::state::LinkedBy;
use crate::{Context, Error};

const COLOR_BLUE: u32 = 0x3498DB;
const COLOR_GREEN: u32 = 0x2ECC71;
const COLOR_RED: u32 = 0xE74C3C;

/// Link your Discord account to your Seerr account
#[poise::command(slash_command, rename = "link-account")]
pub async fn link_account(ctx: Context<'_>) -> Result<(), Error> {
    let discord_id = ctx.author().id.to_string();

    if let Some(existing) = ctx.data().links.find_by_discord_id(&discord_id).await {
        let embed = serenity::CreateEmbed::new()
            .title("Account Already Linked")
            .description(format!(
                "Your Discord account is already linked to Seerr user: **{}**",
                existing.seerr_username
            ))
            .color(COLOR_BLUE);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    // Scanning Seerr user settings can take a while.
    ctx.defer_ephemeral().await?;

    if !ctx.data().seerr.test_connection().await {
        let embed = serenity::CreateEmbed::new()
            .title("Connection Error")
            .description("Unable to connect to Seerr. Please check your configuration.")
            .color(COLOR_RED);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    }

    info!("Attempting to link account for Discord user: {}", discord_id);
    let seerr_user = match ctx.data().seerr.find_user_by_discord_id(&discord_id).await {
        Ok(user) => user,
        Err(e) => {
            error!("Error in link-account command: {}", e);
            let embed = serenity::CreateEmbed::new()
                .title("Error")
                .description("An error occurred while linking your account. Please try again.")
                .color(COLOR_RED);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    let Some(seerr_user) = seerr_user else {
        let embed = serenity::CreateEmbed::new()
            .title("Account Not Found")
            .description(
                "Your Discord ID was not found in Seerr. Please make sure you have added \
                 your Discord ID to your Seerr profile first.",
            )
            .field(
                "How to add Discord ID",
                "1. Go to your Seerr profile\n2. Add your Discord ID to your profile\n3. Try linking again",
                false,
            )
            .color(COLOR_RED);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    };

    let seerr_username = seerr_user.resolved_username();

    match ctx
        .data()
        .links
        .link(&discord_id, seerr_user.id, &seerr_username, LinkedBy::SelfService)
        .await
    {
        Ok(_) => {
            let mut embed = serenity::CreateEmbed::new()
                .title("Account Linked Successfully!")
                .description(format!(
                    "Your Discord account has been linked to Seerr user: **{}**",
                    seerr_username
                ))
                .color(COLOR_GREEN);

            if seerr_user.is_admin() {
                embed = embed.field(
                    "Admin Access",
                    "Your Seerr account holds admin privilege, so admin commands are available to you.",
                    false,
                );
            }

            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
        Err(BotError::Conflict {
            discord_id: holder, ..
        }) => {
            let embed = serenity::CreateEmbed::new()
                .title("Account Already in Use")
                .description(format!(
                    "Seerr user **{}** is already linked to another Discord account (<@{}>). \
                     Contact an admin if this is incorrect.",
                    seerr_username, holder
                ))
                .color(COLOR_RED);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
        Err(e) => {
            error!("Error in link-account command: {}", e);
            let embed = serenity::CreateEmbed::new()
                .title("Link Failed")
                .description("Failed to link your account. Please try again or contact an administrator.")
                .color(COLOR_RED);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
    }

    Ok(())
}

/// Unlink your Discord account from Seerr
#[poise::command(slash_command, rename = "unlink-account")]
pub async fn unlink_account(ctx: Context<'_>) -> Result<(), Error> {
    let discord_id = ctx.author().id.to_string();

    let Some(existing) = ctx.data().links.find_by_discord_id(&discord_id).await else {
        let embed = serenity::CreateEmbed::new()
            .title("No Linked Account")
            .description("Your Discord account is not linked to any Seerr account.")
            .color(COLOR_BLUE);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    };

    match ctx.data().links.unlink(&discord_id).await {
        Ok(_) => {
            let embed = serenity::CreateEmbed::new()
                .title("Account Unlinked Successfully!")
                .description(format!(
                    "Your Discord account has been unlinked from Seerr user: **{}**",
                    existing.seerr_username
                ))
                .color(COLOR_GREEN);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
        Err(e) => {
            error!("Error in unlink-account command: {}", e);
            let embed = serenity::CreateEmbed::new()
                .title("Unlink Failed")
                .description("Failed to unlink your account. Please try again or contact an administrator.")
                .color(COLOR_RED);
            ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
                .await?;
        }
    }

    Ok(())
}

/// Check your account status and request statistics
#[poise::command(slash_command)]
pub async fn status(ctx: Context<'_>) -> Result<(), Error> {
    let discord_id = ctx.author().id.to_string();

    let Some(link) = ctx.data().links.find_by_discord_id(&discord_id).await else {
        let embed = serenity::CreateEmbed::new()
            .title("No Linked Account")
            .description("You need to link your Seerr account first using `/link-account`.")
            .color(COLOR_RED);
        ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
            .await?;
        return Ok(());
    };

    ctx.defer_ephemeral().await?;

    let mut embed = serenity::CreateEmbed::new()
        .title("Account Status")
        .description(format!("**Seerr User:** {}", link.seerr_username))
        .color(COLOR_BLUE);

    match ctx.data().seerr.request_stats(link.seerr_user_id).await {
        Ok(stats) => {
            embed = embed.field(
                "Request Statistics",
                format!(
                    "**Total Requests:** {}\n**Approved:** {}\n**Pending:** {}\n**Declined:** {}",
                    stats.total, stats.approved, stats.pending, stats.declined
                ),
                false,
            );
        }
        Err(e) => {
            warn!("Could not fetch user stats: {}", e);
        }
    }

    embed = embed
        .field(
            "Linked Since",
            format!("<t:{}:R>", link.linked_at.timestamp()),
            true,
        )
        .field("Linked By", link.linked_by.to_string(), true);

    ctx.send(poise::CreateReply::default().embed(embed).ephemeral(true))
        .await?;

    Ok(())
}
