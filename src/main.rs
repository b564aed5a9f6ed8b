use anyhow::{Context as _, Result};
use clap::Parser;
use dotenv::dotenv;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Discord bot relaying Seerr request notifications to linked users
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Force re-sync of slash commands (use when commands aren't showing up)
    #[arg(long, short = 's')]
    sync_commands: bool,

    /// Register commands per-guild instead of globally (faster for testing)
    #[arg(long)]
    guild_commands: bool,

    /// Specific guild ID to sync commands to (for testing)
    #[arg(long)]
    guild_id: Option<u64>,
}

mod commands;
mod config;
mod error;
mod logging;
mod managers;
mod notify;
mod seerr;
mod state;
mod web;

use commands::{
    check_discord_id, force_link, force_link_member, health, help, link_account, ping,
    reset_commands, status, sync, unlink_account, unlink_member, unlink_user, users,
};
use config::AppConfig;
use managers::{
    create_shared_admin_gate, create_shared_link_manager, SharedAdminGate, SharedLinkManager,
};
use notify::{DiscordMessenger, Dispatcher};
use seerr::SeerrClient;
use state::{create_shared_link_store, LinkStore};
use web::{start_webhook_server, WebhookServerConfig, WebhookState};

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;

/// Shared application state
pub struct Data {
    pub config: Arc<AppConfig>,
    pub links: SharedLinkManager,
    pub seerr: Arc<SeerrClient>,
    pub admin_gate: SharedAdminGate,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let config = Arc::new(AppConfig::from_env().context("Failed to load configuration")?);
    logging::init(&config.log_level, config.debug_mode);

    // Extract bot/application ID from token (first part before the dot, base64 encoded)
    if let Some(bot_id_b64) = config.discord_token.split('.').next() {
        // Discord tokens use URL-safe base64 without padding
        use base64::Engine;
        let decoded = base64::engine::general_purpose::STANDARD_NO_PAD
            .decode(bot_id_b64)
            .or_else(|_| base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bot_id_b64));
        if let Ok(decoded) = decoded {
            if let Ok(id_str) = String::from_utf8(decoded) {
                info!("Bot ID: {}", id_str);
            }
        }
    }

    // Ensure the link database directory exists
    if let Some(parent) = std::path::Path::new(&config.database_path).parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    info!("Loading link store from {}...", config.database_path);
    let link_store = LinkStore::load(&config.database_path)
        .await
        .unwrap_or_else(|e| {
            warn!("Could not load link store: {}, using empty store", e);
            LinkStore::new()
        });
    info!("Loaded {} linked account(s)", link_store.link_count());
    let shared_link_store = create_shared_link_store(link_store);

    let links = create_shared_link_manager(shared_link_store, config.database_path.clone());
    let seerr_client = Arc::new(
        SeerrClient::new(&config.seerr_url, &config.seerr_api_key)
            .context("Failed to create Seerr client")?,
    );
    // Extract CLI flags for use in setup
    let sync_commands = args.sync_commands;
    let guild_commands = args.guild_commands;
    let target_guild_id = args.guild_id.or(config.discord_guild_id);

    if sync_commands {
        info!("--sync-commands: Will force re-register slash commands");
    }
    if guild_commands {
        info!("--guild-commands: Will register commands per-guild (faster for testing)");
    }

    let setup_config = config.clone();
    let setup_links = links.clone();
    let setup_seerr = seerr_client.clone();

    // Build framework
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                ping(),
                help(),
                link_account(),
                unlink_account(),
                status(),
                health(),
                users(),
                force_link_member(),
                unlink_member(),
                force_link(),
                unlink_user(),
                check_discord_id(),
                sync(),
                reset_commands(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' invoked by {} (ID: {})",
                        ctx.command().qualified_name,
                        ctx.author().name,
                        ctx.author().id,
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    info!(
                        "Command '{}' completed for {}",
                        ctx.command().qualified_name,
                        ctx.author().name
                    );
                })
            },
            on_error: |error| {
                Box::pin(async move {
                    match error {
                        poise::FrameworkError::Command { error, ctx, .. } => {
                            error!(
                                "Error in command '{}': {}",
                                ctx.command().qualified_name,
                                error
                            );
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("An unexpected error occurred. Please try again later.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        poise::FrameworkError::ArgumentParse {
                            error, input, ctx, ..
                        } => {
                            error!(
                                "Argument parse error in '{}': {} (input: {:?})",
                                ctx.command().qualified_name,
                                error,
                                input
                            );
                        }
                        poise::FrameworkError::GuildOnly { ctx, .. } => {
                            let _ = ctx
                                .send(
                                    poise::CreateReply::default()
                                        .content("This command can only be used in a server.")
                                        .ephemeral(true),
                                )
                                .await;
                        }
                        other => {
                            error!("Other framework error: {}", other);
                        }
                    }
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            let config = setup_config;
            let links = setup_links;
            let seerr = setup_seerr;

            Box::pin(async move {
                info!("Bot logged in as: {}", ready.user.name);
                info!("Connected to {} guild(s)", ready.guilds.len());

                if seerr.test_connection().await {
                    info!("Seerr API connection successful");
                } else {
                    warn!("Seerr API connection failed - check SEERR_URL and SEERR_API_KEY");
                }

                // Determine which guilds to register commands for
                let guilds_to_register: Vec<serenity::GuildId> =
                    if let Some(gid) = target_guild_id {
                        vec![serenity::GuildId::new(gid)]
                    } else {
                        ready.guilds.iter().map(|g| g.id).collect()
                    };

                if guild_commands || sync_commands {
                    for guild_id in &guilds_to_register {
                        info!("Registering commands to guild: {}", guild_id);
                        if let Err(e) = poise::builtins::register_in_guild(
                            ctx,
                            &framework.options().commands,
                            *guild_id,
                        )
                        .await
                        {
                            error!("Failed to register commands for guild {}: {}", guild_id, e);
                        }
                    }
                } else {
                    info!("Registering commands globally (may take up to 1 hour to propagate)");
                    if let Err(e) =
                        poise::builtins::register_globally(ctx, &framework.options().commands)
                            .await
                    {
                        error!("Failed to register commands globally: {}", e);
                    }
                }

                // Start the webhook server now that we have an HTTP client
                // to deliver through.
                let messenger = Arc::new(DiscordMessenger::new(ctx.http.clone()));
                let dispatcher = Arc::new(Dispatcher::new(
                    messenger,
                    links.clone(),
                    serenity::ChannelId::new(config.notification_channel_id),
                ));
                let server_config = WebhookServerConfig {
                    host: config.webhook_host.clone(),
                    port: config.webhook_port,
                };
                let webhook_state = WebhookState {
                    auth_header: config.webhook_auth_header.clone(),
                    seerr_url: config.seerr_url.clone(),
                    dispatcher,
                };
                tokio::spawn(async move {
                    if let Err(e) = start_webhook_server(server_config, webhook_state).await {
                        error!("Webhook server error: {}", e);
                    }
                });

                ctx.set_activity(Some(serenity::ActivityData::watching("Seerr requests")));

                let admin_gate = create_shared_admin_gate(links.clone(), seerr.clone());
                Ok(Data {
                    config,
                    links,
                    seerr,
                    admin_gate,
                })
            })
        })
        .build();

    let intents = serenity::GatewayIntents::non_privileged();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await?;

    info!("Starting bot...");
    client.start().await?;
    warn!("Bot ended.");

    Ok(())
}
