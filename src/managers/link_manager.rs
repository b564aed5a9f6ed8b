use std::sync::Arc;
use tracing::{info, warn};

use crate::error::Result;
use crate::state::{Link, LinkStore, LinkedBy, SharedLinkStore};

/// Durable mutation facade over the link store.
///
/// Every mutation is applied to a copy, persisted to disk, and only then
/// committed to the shared store, so a link is never reported as created
/// or removed unless it survives a restart. Holding the write lock across the
/// save also serializes mutations, so concurrent webhook deliveries and
/// admin commands cannot interleave partial updates.
pub struct LinkManager {
    store: SharedLinkStore,
    db_path: String,
}

impl LinkManager {
    pub fn new(store: SharedLinkStore, db_path: impl Into<String>) -> Self {
        Self {
            store,
            db_path: db_path.into(),
        }
    }

    /// Create or refresh a link. Conflicts are returned without touching
    /// the store.
    pub async fn link(
        &self,
        discord_id: &str,
        seerr_user_id: u64,
        seerr_username: &str,
        linked_by: LinkedBy,
    ) -> Result<Link> {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        let link = next.upsert_link(discord_id, seerr_user_id, seerr_username, linked_by)?;
        next.save(&self.db_path).await?;
        *store = next;

        info!(
            "Linked Discord ID {} to Seerr user '{}' ({})",
            discord_id, seerr_username, linked_by
        );
        Ok(link)
    }

    /// Admin takeover. Displaced links are logged and returned.
    pub async fn force_link(
        &self,
        discord_id: &str,
        seerr_user_id: u64,
        seerr_username: &str,
    ) -> Result<(Link, Vec<Link>)> {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        let (link, displaced) = next.force_link(discord_id, seerr_user_id, seerr_username);
        next.save(&self.db_path).await?;
        *store = next;

        for old in &displaced {
            warn!(
                "Force-link takeover: Discord ID {} lost Seerr user '{}' to Discord ID {}",
                old.discord_id, old.seerr_username, discord_id
            );
        }
        info!(
            "Force-linked Discord ID {} to Seerr user '{}'",
            discord_id, seerr_username
        );
        Ok((link, displaced))
    }

    /// Remove a link, returning it if one existed.
    pub async fn unlink(&self, discord_id: &str) -> Result<Option<Link>> {
        let mut store = self.store.write().await;
        let mut next = store.clone();
        let removed = next.remove_link(discord_id);
        if removed.is_none() {
            return Ok(None);
        }
        next.save(&self.db_path).await?;
        *store = next;

        info!("Unlinked Discord ID {}", discord_id);
        Ok(removed)
    }

    pub async fn find_by_discord_id(&self, discord_id: &str) -> Option<Link> {
        let store = self.store.read().await;
        store.find_by_discord_id(discord_id).cloned()
    }

    pub async fn find_by_seerr_username(&self, seerr_username: &str) -> Option<Link> {
        let store = self.store.read().await;
        store.find_by_seerr_username(seerr_username).cloned()
    }

    /// All links, newest first.
    pub async fn list_links(&self) -> Vec<Link> {
        let store = self.store.read().await;
        store.list_links().into_iter().cloned().collect()
    }

    pub async fn find_conflicts(&self) -> Vec<(String, String)> {
        let store = self.store.read().await;
        store.find_conflicts()
    }

    pub async fn link_count(&self) -> usize {
        let store = self.store.read().await;
        store.link_count()
    }
}

/// Shared link manager type
pub type SharedLinkManager = Arc<LinkManager>;

pub fn create_shared_link_manager(
    store: SharedLinkStore,
    db_path: impl Into<String>,
) -> SharedLinkManager {
    Arc::new(LinkManager::new(store, db_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_shared_link_store;

    fn manager() -> (LinkManager, String) {
        let path = std::env::temp_dir()
            .join(format!(
                "discordeerr-manager-{}-{}.json",
                std::process::id(),
                rand_suffix()
            ))
            .to_string_lossy()
            .to_string();
        let store = create_shared_link_store(LinkStore::new());
        (LinkManager::new(store, path.clone()), path)
    }

    fn rand_suffix() -> u128 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    }

    #[tokio::test]
    async fn test_link_persists_before_returning() {
        let (manager, path) = manager();

        manager
            .link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .await
            .unwrap();

        // A fresh load from disk must already see the link.
        let reloaded = LinkStore::load(&path).await.unwrap();
        assert!(reloaded.find_by_discord_id("123456789012345678").is_some());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_conflict_does_not_persist_anything() {
        let (manager, path) = manager();

        manager
            .link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .await
            .unwrap();
        let err = manager
            .link("222222222222222222", 7, "alice", LinkedBy::SelfService)
            .await
            .unwrap_err();
        assert!(matches!(err, crate::error::BotError::Conflict { .. }));

        let reloaded = LinkStore::load(&path).await.unwrap();
        assert_eq!(reloaded.link_count(), 1);
        assert!(reloaded.find_by_discord_id("222222222222222222").is_none());

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_force_link_then_unlink() {
        let (manager, path) = manager();

        manager
            .link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .await
            .unwrap();
        let (link, displaced) = manager
            .force_link("222222222222222222", 7, "alice")
            .await
            .unwrap();
        assert_eq!(link.discord_id, "222222222222222222");
        assert_eq!(displaced.len(), 1);
        assert_eq!(displaced[0].discord_id, "111111111111111111");

        let removed = manager.unlink("222222222222222222").await.unwrap();
        assert!(removed.is_some());
        assert_eq!(manager.link_count().await, 0);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_unlink_unknown_is_none() {
        let (manager, path) = manager();
        assert!(manager.unlink("123456789012345678").await.unwrap().is_none());
        tokio::fs::remove_file(&path).await.ok();
    }
}
