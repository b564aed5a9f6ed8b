use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{BotError, Result};

/// How a link was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkedBy {
    /// `/link-account`, verified against the user's own Seerr profile.
    #[serde(rename = "self")]
    SelfService,
    /// Admin force-link, bypassing self-service verification.
    Admin,
}

impl std::fmt::Display for LinkedBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkedBy::SelfService => write!(f, "self"),
            LinkedBy::Admin => write!(f, "admin"),
        }
    }
}

/// An association between a Discord account and a Seerr account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Discord user ID (snowflake as string).
    pub discord_id: String,

    /// Numeric Seerr user ID, needed for API round-trips.
    pub seerr_user_id: u64,

    /// Seerr username the notifications are keyed on.
    pub seerr_username: String,

    /// When the link was created.
    pub linked_at: DateTime<Utc>,

    pub linked_by: LinkedBy,
}

/// Persisted link table, keyed by Discord ID.
///
/// Uniqueness is enforced on both sides at write time: the map key covers
/// the Discord side, `upsert_link` covers the Seerr side. Data imported
/// around the normal write path can still violate the Seerr side, which is
/// what `find_conflicts` reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStore {
    /// Schema version for migrations
    pub version: u32,

    /// Last update timestamp
    pub last_updated: DateTime<Utc>,

    links: HashMap<String, Link>,
}

impl Default for LinkStore {
    fn default() -> Self {
        Self {
            version: 1,
            last_updated: Utc::now(),
            links: HashMap::new(),
        }
    }
}

impl LinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file, or create new if not exists.
    pub async fn load(path: &str) -> Result<Self> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| BotError::StateParse {
                    path: path.to_string(),
                    source: e,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(e) => Err(BotError::StateLoad {
                path: path.to_string(),
                source: e,
            }),
        }
    }

    /// Save to a JSON file atomically.
    pub async fn save(&self, path: &str) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = format!("{}.tmp", path);
        tokio::fs::write(&temp_path, &content)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(|e| BotError::StateSave {
                path: path.to_string(),
                source: e,
            })?;

        Ok(())
    }

    /// Create or refresh a link, enforcing uniqueness on both sides.
    ///
    /// Fails with `Conflict` if the Discord ID is already linked to a
    /// different Seerr user, or the Seerr username is already held by a
    /// different Discord ID. Re-linking the same pair refreshes
    /// `linked_at` and succeeds. The store is unchanged on error.
    pub fn upsert_link(
        &mut self,
        discord_id: &str,
        seerr_user_id: u64,
        seerr_username: &str,
        linked_by: LinkedBy,
    ) -> Result<Link> {
        if let Some(existing) = self.links.get(discord_id) {
            if existing.seerr_username != seerr_username {
                return Err(BotError::Conflict {
                    discord_id: discord_id.to_string(),
                    seerr_username: existing.seerr_username.clone(),
                });
            }
        }

        if let Some(holder) = self.find_by_seerr_username(seerr_username) {
            if holder.discord_id != discord_id {
                return Err(BotError::Conflict {
                    discord_id: holder.discord_id.clone(),
                    seerr_username: seerr_username.to_string(),
                });
            }
        }

        let link = Link {
            discord_id: discord_id.to_string(),
            seerr_user_id,
            seerr_username: seerr_username.to_string(),
            linked_at: Utc::now(),
            linked_by,
        };
        self.links.insert(discord_id.to_string(), link.clone());
        self.last_updated = Utc::now();
        Ok(link)
    }

    /// Admin takeover: unlink the prior holder(s) on both sides and insert
    /// the new link in a single mutation. Returns the new link and every
    /// link that was displaced, so the caller can log the takeover.
    pub fn force_link(
        &mut self,
        discord_id: &str,
        seerr_user_id: u64,
        seerr_username: &str,
    ) -> (Link, Vec<Link>) {
        let mut displaced = Vec::new();

        if let Some(old) = self.links.remove(discord_id) {
            if old.seerr_username != seerr_username {
                displaced.push(old);
            }
        }

        let other_holders: Vec<String> = self
            .links
            .values()
            .filter(|l| l.seerr_username == seerr_username)
            .map(|l| l.discord_id.clone())
            .collect();
        for id in other_holders {
            if let Some(old) = self.links.remove(&id) {
                displaced.push(old);
            }
        }

        let link = Link {
            discord_id: discord_id.to_string(),
            seerr_user_id,
            seerr_username: seerr_username.to_string(),
            linked_at: Utc::now(),
            linked_by: LinkedBy::Admin,
        };
        self.links.insert(discord_id.to_string(), link.clone());
        self.last_updated = Utc::now();
        (link, displaced)
    }

    /// Remove a link, returning it if one existed.
    pub fn remove_link(&mut self, discord_id: &str) -> Option<Link> {
        let removed = self.links.remove(discord_id);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    pub fn find_by_discord_id(&self, discord_id: &str) -> Option<&Link> {
        self.links.get(discord_id)
    }

    pub fn find_by_seerr_username(&self, seerr_username: &str) -> Option<&Link> {
        self.links
            .values()
            .find(|l| l.seerr_username == seerr_username)
    }

    /// All links, newest first.
    pub fn list_links(&self) -> Vec<&Link> {
        let mut links: Vec<&Link> = self.links.values().collect();
        links.sort_by(|a, b| b.linked_at.cmp(&a.linked_at));
        links
    }

    /// `(discord_id, seerr_username)` pairs violating Seerr-side
    /// uniqueness, sorted for stable reporting.
    pub fn find_conflicts(&self) -> Vec<(String, String)> {
        let mut by_username: HashMap<&str, Vec<&Link>> = HashMap::new();
        for link in self.links.values() {
            by_username
                .entry(link.seerr_username.as_str())
                .or_default()
                .push(link);
        }

        let mut conflicts: Vec<(String, String)> = by_username
            .into_values()
            .filter(|group| group.len() > 1)
            .flatten()
            .map(|l| (l.discord_id.clone(), l.seerr_username.clone()))
            .collect();
        conflicts.sort();
        conflicts
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }
}

/// Shared link store type
pub type SharedLinkStore = Arc<tokio::sync::RwLock<LinkStore>>;

pub fn create_shared_link_store(store: LinkStore) -> SharedLinkStore {
    Arc::new(tokio::sync::RwLock::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(discord_id: &str, seerr_user_id: u64, seerr_username: &str) -> Link {
        Link {
            discord_id: discord_id.to_string(),
            seerr_user_id,
            seerr_username: seerr_username.to_string(),
            linked_at: Utc::now(),
            linked_by: LinkedBy::SelfService,
        }
    }

    #[test]
    fn test_upsert_and_lookup() {
        let mut store = LinkStore::new();

        let created = store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();
        assert_eq!(created.seerr_username, "alice");

        assert!(store.find_by_discord_id("123456789012345678").is_some());
        assert_eq!(
            store
                .find_by_seerr_username("alice")
                .map(|l| l.discord_id.as_str()),
            Some("123456789012345678")
        );
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_upsert_conflict_on_discord_side_leaves_store_unchanged() {
        let mut store = LinkStore::new();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();

        let err = store
            .upsert_link("123456789012345678", 8, "bob", LinkedBy::SelfService)
            .unwrap_err();
        assert!(matches!(err, BotError::Conflict { .. }));

        let kept = store.find_by_discord_id("123456789012345678").unwrap();
        assert_eq!(kept.seerr_username, "alice");
        assert!(store.find_by_seerr_username("bob").is_none());
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_upsert_conflict_on_seerr_side_leaves_store_unchanged() {
        let mut store = LinkStore::new();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();

        let err = store
            .upsert_link("876543210987654321", 7, "alice", LinkedBy::SelfService)
            .unwrap_err();
        match err {
            BotError::Conflict {
                discord_id,
                seerr_username,
            } => {
                assert_eq!(discord_id, "123456789012345678");
                assert_eq!(seerr_username, "alice");
            }
            other => panic!("expected Conflict, got {:?}", other),
        }

        assert!(store.find_by_discord_id("876543210987654321").is_none());
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_relink_same_pair_refreshes() {
        let mut store = LinkStore::new();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_force_link_displaces_both_sides_atomically() {
        let mut store = LinkStore::new();
        store
            .upsert_link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .unwrap();
        store
            .upsert_link("222222222222222222", 8, "bob", LinkedBy::SelfService)
            .unwrap();

        // Take "bob" over for the Discord account currently linked to "alice".
        let (created, displaced) = store.force_link("111111111111111111", 8, "bob");

        assert_eq!(created.linked_by, LinkedBy::Admin);
        assert_eq!(displaced.len(), 2);

        // No intermediate state: exactly one link for the Discord ID, one
        // holder for the username, the old pairs gone.
        let current = store.find_by_discord_id("111111111111111111").unwrap();
        assert_eq!(current.seerr_username, "bob");
        assert!(store.find_by_seerr_username("alice").is_none());
        assert!(store.find_by_discord_id("222222222222222222").is_none());
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_force_link_same_pair_is_not_a_takeover() {
        let mut store = LinkStore::new();
        store
            .upsert_link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .unwrap();

        let (_, displaced) = store.force_link("111111111111111111", 7, "alice");
        assert!(displaced.is_empty());
        assert_eq!(store.link_count(), 1);
    }

    #[test]
    fn test_remove_link() {
        let mut store = LinkStore::new();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::SelfService)
            .unwrap();

        let removed = store.remove_link("123456789012345678").unwrap();
        assert_eq!(removed.seerr_username, "alice");
        assert!(store.remove_link("123456789012345678").is_none());
        assert_eq!(store.link_count(), 0);
    }

    #[test]
    fn test_find_conflicts_reports_duplicate_seerr_username() {
        let mut store = LinkStore::new();
        store
            .upsert_link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .unwrap();

        // Simulate legacy data inserted around the normal write path.
        store
            .links
            .insert("222222222222222222".to_string(), link("222222222222222222", 7, "alice"));

        let conflicts = store.find_conflicts();
        assert_eq!(
            conflicts,
            vec![
                ("111111111111111111".to_string(), "alice".to_string()),
                ("222222222222222222".to_string(), "alice".to_string()),
            ]
        );
    }

    #[test]
    fn test_find_conflicts_empty_on_healthy_store() {
        let mut store = LinkStore::new();
        store
            .upsert_link("111111111111111111", 7, "alice", LinkedBy::SelfService)
            .unwrap();
        store
            .upsert_link("222222222222222222", 8, "bob", LinkedBy::SelfService)
            .unwrap();
        assert!(store.find_conflicts().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_roundtrip() {
        let path = std::env::temp_dir()
            .join(format!("discordeerr-links-{}.json", std::process::id()))
            .to_string_lossy()
            .to_string();

        let mut store = LinkStore::new();
        store
            .upsert_link("123456789012345678", 7, "alice", LinkedBy::Admin)
            .unwrap();
        store.save(&path).await.unwrap();

        let loaded = LinkStore::load(&path).await.unwrap();
        let link = loaded.find_by_discord_id("123456789012345678").unwrap();
        assert_eq!(link.seerr_user_id, 7);
        assert_eq!(link.seerr_username, "alice");
        assert_eq!(link.linked_by, LinkedBy::Admin);

        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty_store() {
        let store = LinkStore::load("/nonexistent/links.json").await.unwrap();
        assert_eq!(store.link_count(), 0);
    }
}
