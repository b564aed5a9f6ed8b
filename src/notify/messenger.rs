//! Message-send seam between the dispatcher and the chat platform.

use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;
use crate::notify::render::RenderedMessage;

/// The send surface the dispatcher talks to. Behind a trait so dispatch
/// logic can be exercised without a live gateway.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_dm(&self, user_id: serenity::UserId, message: &RenderedMessage) -> Result<()>;

    async fn send_channel(
        &self,
        channel_id: serenity::ChannelId,
        message: &RenderedMessage,
    ) -> Result<()>;
}

/// Discord implementation over the serenity HTTP client.
pub struct DiscordMessenger {
    http: Arc<serenity::Http>,
}

impl DiscordMessenger {
    pub fn new(http: Arc<serenity::Http>) -> Self {
        Self { http }
    }

    fn build_message(message: &RenderedMessage) -> serenity::CreateMessage {
        let mut embed = serenity::CreateEmbed::new()
            .title(&message.title)
            .description(&message.description)
            .colour(message.color)
            .timestamp(serenity::Timestamp::now());

        if let Some(name) = &message.author_name {
            let mut author = serenity::CreateEmbedAuthor::new(name);
            if let Some(icon) = &message.author_icon_url {
                author = author.icon_url(icon);
            }
            embed = embed.author(author);
        }

        for field in &message.fields {
            embed = embed.field(&field.name, &field.value, field.inline);
        }

        if let Some(image) = &message.image_url {
            embed = embed.thumbnail(image);
        }

        let mut create = serenity::CreateMessage::new().embed(embed);

        if !message.buttons.is_empty() {
            let buttons = message
                .buttons
                .iter()
                .map(|b| serenity::CreateButton::new_link(&b.url).label(&b.label))
                .collect();
            create = create.components(vec![serenity::CreateActionRow::Buttons(buttons)]);
        }

        create
    }
}

#[async_trait]
impl Messenger for DiscordMessenger {
    async fn send_dm(&self, user_id: serenity::UserId, message: &RenderedMessage) -> Result<()> {
        let channel = user_id.create_dm_channel(&*self.http).await?;
        channel
            .send_message(&*self.http, Self::build_message(message))
            .await?;
        debug!("Sent DM notification to user {}", user_id);
        Ok(())
    }

    async fn send_channel(
        &self,
        channel_id: serenity::ChannelId,
        message: &RenderedMessage,
    ) -> Result<()> {
        channel_id
            .send_message(&*self.http, Self::build_message(message))
            .await?;
        debug!("Sent channel notification to {}", channel_id);
        Ok(())
    }
}
