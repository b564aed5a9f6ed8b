//! Delivery of rendered notifications: DM first, shared channel as the
//! degraded fallback. At-most-once; nothing is queued or retried beyond a
//! single rate-limit backoff.

use poise::serenity_prelude as serenity;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::{BotError, Result};
use crate::managers::SharedLinkManager;
use crate::notify::event::NotificationEvent;
use crate::notify::messenger::Messenger;
use crate::notify::render::RenderedMessage;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub dm_sent: bool,
    pub channel_fallback_used: bool,
    pub recipient: Option<String>,
}

pub struct Dispatcher {
    messenger: Arc<dyn Messenger>,
    links: SharedLinkManager,
    channel_id: serenity::ChannelId,
    retry_backoff: Duration,
}

impl Dispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        links: SharedLinkManager,
        channel_id: serenity::ChannelId,
    ) -> Self {
        Self {
            messenger,
            links,
            channel_id,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Deliver one rendered event. A resolvable recipient gets a DM; any
    /// DM failure, or the absence of a recipient, demotes to exactly one
    /// post in the shared notification channel so the event is never
    /// silently dropped.
    pub async fn dispatch(
        &self,
        event: &NotificationEvent,
        rendered: &RenderedMessage,
    ) -> DeliveryOutcome {
        let Some(recipient) = self.resolve_recipient(event).await else {
            debug!("No deliverable recipient for event, posting to channel");
            return DeliveryOutcome {
                dm_sent: false,
                channel_fallback_used: self.post_to_channel(rendered).await,
                recipient: None,
            };
        };

        match self.try_dm(&recipient, rendered).await {
            Ok(()) => DeliveryOutcome {
                dm_sent: true,
                channel_fallback_used: false,
                recipient: Some(recipient),
            },
            Err(e) => {
                warn!(
                    "DM to {} failed ({}), falling back to channel post",
                    recipient, e
                );
                DeliveryOutcome {
                    dm_sent: false,
                    channel_fallback_used: self.post_to_channel(rendered).await,
                    recipient: Some(recipient),
                }
            }
        }
    }

    /// A recipient is deliverable only when a link exists: either the
    /// payload's Discord ID field resolves in the store, or the requester's
    /// Seerr username does.
    async fn resolve_recipient(&self, event: &NotificationEvent) -> Option<String> {
        if let Some(discord_id) = &event.target_discord_id {
            if !is_valid_snowflake(discord_id) {
                warn!("Ignoring malformed Discord ID in payload: {}", discord_id);
            } else if self.links.find_by_discord_id(discord_id).await.is_some() {
                return Some(discord_id.clone());
            } else {
                debug!("No link for Discord ID {} in payload", discord_id);
            }
        }

        // Fall back to the requester's Seerr username, but only for events
        // actually addressed to the requester.
        if event.kind.notifies_requester() {
            if let Some(requester) = &event.requested_by.username {
                if let Some(link) = self.links.find_by_seerr_username(requester).await {
                    if is_valid_snowflake(&link.discord_id) {
                        return Some(link.discord_id);
                    }
                }
            }
        }

        None
    }

    /// One DM attempt, with a single backoff-and-retry when Discord rate
    /// limits us. Anything else fails straight through to the caller.
    async fn try_dm(&self, discord_id: &str, rendered: &RenderedMessage) -> Result<()> {
        let id: u64 = discord_id
            .parse()
            .ok()
            .filter(|id| *id != 0)
            .ok_or_else(|| BotError::Delivery {
                message: format!("invalid Discord ID '{}'", discord_id),
            })?;
        let user_id = serenity::UserId::new(id);

        match self.messenger.send_dm(user_id, rendered).await {
            Err(BotError::RateLimited) => {
                warn!(
                    "Rate limited sending DM to {}, retrying in {:?}",
                    discord_id, self.retry_backoff
                );
                tokio::time::sleep(self.retry_backoff).await;
                self.messenger.send_dm(user_id, rendered).await
            }
            other => other,
        }
    }

    async fn post_to_channel(&self, rendered: &RenderedMessage) -> bool {
        match self.messenger.send_channel(self.channel_id, rendered).await {
            Ok(()) => true,
            Err(e) => {
                error!("Channel fallback post failed: {}", e);
                false
            }
        }
    }
}

fn is_valid_snowflake(s: &str) -> bool {
    s.parse::<u64>().map(|id| id != 0).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::managers::{create_shared_link_manager, SharedLinkManager};
    use crate::notify::event::NotificationEvent;
    use crate::notify::render::render;
    use crate::state::{create_shared_link_store, LinkStore, LinkedBy};
    use crate::web::payload::WebhookPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Recording messenger with scriptable DM failures.
    #[derive(Default)]
    struct MockMessenger {
        dm_attempts: AtomicUsize,
        channel_posts: AtomicUsize,
        dm_recipients: Mutex<Vec<u64>>,
        fail_dm_with: Mutex<Vec<BotError>>,
    }

    impl MockMessenger {
        fn failing_dm(errors: Vec<BotError>) -> Self {
            Self {
                fail_dm_with: Mutex::new(errors),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Messenger for MockMessenger {
        async fn send_dm(
            &self,
            user_id: serenity::UserId,
            _message: &RenderedMessage,
        ) -> Result<()> {
            self.dm_attempts.fetch_add(1, Ordering::SeqCst);
            self.dm_recipients.lock().unwrap().push(user_id.get());
            match self.fail_dm_with.lock().unwrap().pop() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }

        async fn send_channel(
            &self,
            _channel_id: serenity::ChannelId,
            _message: &RenderedMessage,
        ) -> Result<()> {
            self.channel_posts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    static TEMP_SEQ: AtomicUsize = AtomicUsize::new(0);

    fn temp_db_path() -> String {
        std::env::temp_dir()
            .join(format!(
                "discordeerr-dispatch-{}-{}.json",
                std::process::id(),
                TEMP_SEQ.fetch_add(1, Ordering::SeqCst)
            ))
            .to_string_lossy()
            .to_string()
    }

    async fn links_with_alice() -> SharedLinkManager {
        let store = create_shared_link_store(LinkStore::new());
        let links = create_shared_link_manager(store, temp_db_path());
        links
            .link("123", 7, "alice", LinkedBy::SelfService)
            .await
            .unwrap();
        links
    }

    fn available_event() -> NotificationEvent {
        NotificationEvent::from_payload(
            &WebhookPayload::parse(
                br#"{
                    "notification_type": "MEDIA_AVAILABLE",
                    "subject": "Dune: Part Two (2024)",
                    "notifyuser_settings_discordId": "123",
                    "requestedBy_username": "alice"
                }"#,
            )
            .unwrap(),
        )
    }

    fn dispatcher(messenger: Arc<MockMessenger>, links: SharedLinkManager) -> Dispatcher {
        Dispatcher::new(messenger, links, serenity::ChannelId::new(99))
            .with_retry_backoff(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_linked_target_gets_exactly_one_dm_and_no_channel_post() {
        let messenger = Arc::new(MockMessenger::default());
        let links = links_with_alice().await;
        let event = available_event();
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(outcome.dm_sent);
        assert!(!outcome.channel_fallback_used);
        assert_eq!(outcome.recipient.as_deref(), Some("123"));
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 0);
        assert_eq!(*messenger.dm_recipients.lock().unwrap(), vec![123]);
    }

    #[tokio::test]
    async fn test_unlinked_target_skips_dm_and_posts_to_channel_once() {
        let messenger = Arc::new(MockMessenger::default());
        // Empty store: "123" carries no link.
        let store = create_shared_link_store(LinkStore::new());
        let links = create_shared_link_manager(store, "/tmp/unused-links.json".to_string());
        let event = available_event();
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(!outcome.dm_sent);
        assert!(outcome.channel_fallback_used);
        assert!(outcome.recipient.is_none());
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dm_failure_falls_back_to_exactly_one_channel_post() {
        let messenger = Arc::new(MockMessenger::failing_dm(vec![BotError::Delivery {
            message: "user has DMs disabled".to_string(),
        }]));
        let links = links_with_alice().await;
        let event = available_event();
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(!outcome.dm_sent);
        assert!(outcome.channel_fallback_used);
        assert_eq!(outcome.recipient.as_deref(), Some("123"));
        // No retry loop: one attempt, one fallback post.
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 1);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_once_then_succeeds() {
        let messenger = Arc::new(MockMessenger::failing_dm(vec![BotError::RateLimited]));
        let links = links_with_alice().await;
        let event = available_event();
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(outcome.dm_sent);
        assert!(!outcome.channel_fallback_used);
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_backoff_exhaustion_falls_back() {
        let messenger = Arc::new(MockMessenger::failing_dm(vec![
            BotError::RateLimited,
            BotError::RateLimited,
        ]));
        let links = links_with_alice().await;
        let event = available_event();
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(!outcome.dm_sent);
        assert!(outcome.channel_fallback_used);
        // One attempt plus one backoff retry, then fallback; never a loop.
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 2);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_requester_username_resolves_when_payload_has_no_discord_id() {
        let messenger = Arc::new(MockMessenger::default());
        let links = links_with_alice().await;
        let event = NotificationEvent::from_payload(
            &WebhookPayload::parse(
                br#"{
                    "notification_type": "MEDIA_DECLINED",
                    "subject": "Dune: Part Two (2024)",
                    "requestedBy_username": "alice"
                }"#,
            )
            .unwrap(),
        );
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(outcome.dm_sent);
        assert_eq!(outcome.recipient.as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn test_admin_event_goes_to_channel_only() {
        let messenger = Arc::new(MockMessenger::default());
        let links = links_with_alice().await;
        // Pending requests go to the shared channel even when the
        // requester is linked.
        let event = NotificationEvent::from_payload(
            &WebhookPayload::parse(
                br#"{
                    "notification_type": "MEDIA_PENDING",
                    "subject": "Dune: Part Two (2024)",
                    "requestedBy_username": "alice"
                }"#,
            )
            .unwrap(),
        );
        let rendered = render(&event, None);

        let outcome = dispatcher(messenger.clone(), links).dispatch(&event, &rendered).await;

        assert!(!outcome.dm_sent);
        assert!(outcome.channel_fallback_used);
        assert_eq!(messenger.dm_attempts.load(Ordering::SeqCst), 0);
        assert_eq!(messenger.channel_posts.load(Ordering::SeqCst), 1);
    }
}
