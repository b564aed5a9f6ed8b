//! Seerr (Jellyseerr/Overseerr) API client.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{BotError, Result};

/// Seerr permission bit granting full admin access.
const PERMISSION_ADMIN: u64 = 2;

/// A Seerr user account. Every name field is optional upstream; use
/// [`SeerrUser::resolved_username`] for a presentable identifier.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeerrUser {
    pub id: u64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub plex_username: Option<String>,
    #[serde(default)]
    pub jellyfin_username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub permissions: u64,
}

impl SeerrUser {
    /// Best available username, falling through the same chain Seerr's own
    /// UI uses.
    pub fn resolved_username(&self) -> String {
        self.username
            .as_deref()
            .or(self.plex_username.as_deref())
            .or(self.jellyfin_username.as_deref())
            .or(self.display_name.as_deref())
            .or(self.email.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("User-{}", self.id))
    }

    /// Whether this account holds admin privilege. User 1 is the Seerr
    /// owner account and is always an admin.
    pub fn is_admin(&self) -> bool {
        self.id == 1 || self.permissions & PERMISSION_ADMIN != 0
    }

    fn matches_username(&self, name: &str) -> bool {
        [
            self.username.as_deref(),
            self.plex_username.as_deref(),
            self.jellyfin_username.as_deref(),
            self.display_name.as_deref(),
            self.email.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|candidate| candidate.eq_ignore_ascii_case(name))
    }
}

/// Per-user notification settings from `/user/{id}/settings/main`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeerrUserSettings {
    #[serde(default)]
    pub discord_id: Option<String>,
}

/// Request counts bucketed by Seerr request status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestStats {
    pub total: usize,
    pub pending: usize,
    pub approved: usize,
    pub declined: usize,
    pub failed: usize,
    pub completed: usize,
}

#[derive(Debug, Deserialize)]
struct RequestPage {
    #[serde(default)]
    results: Vec<RequestEntry>,
}

#[derive(Debug, Deserialize)]
struct RequestEntry {
    #[serde(default)]
    status: u8,
}

pub struct SeerrClient {
    base_url: String,
    http: reqwest::Client,
}

impl SeerrClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key).map_err(|_| BotError::ConfigValidation {
            message: "SEERR_API_KEY contains invalid header characters".to_string(),
        })?;
        key.set_sensitive(true);
        headers.insert("X-Api-Key", key);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// All users known to Seerr. The endpoint returns either a paginated
    /// `{results: [...]}` object or a bare array depending on version.
    pub async fn get_users(&self) -> Result<Vec<SeerrUser>> {
        let value: serde_json::Value = self
            .http
            .get(self.endpoint("user?take=256"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let users = match value {
            serde_json::Value::Array(_) => serde_json::from_value(value)?,
            serde_json::Value::Object(ref obj) if obj.contains_key("results") => {
                serde_json::from_value(obj["results"].clone())?
            }
            _ => {
                warn!("Unexpected response format from user endpoint");
                return Err(BotError::SeerrApi {
                    message: "unexpected response format from user endpoint".to_string(),
                });
            }
        };
        Ok(users)
    }

    pub async fn get_user(&self, user_id: u64) -> Result<Option<SeerrUser>> {
        let response = self
            .http
            .get(self.endpoint(&format!("user/{}", user_id)))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(response.error_for_status()?.json().await?))
    }

    pub async fn get_user_settings(&self, user_id: u64) -> Result<SeerrUserSettings> {
        Ok(self
            .http
            .get(self.endpoint(&format!("user/{}/settings/main", user_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?)
    }

    /// Find the Seerr account whose notification settings carry the given
    /// Discord ID. This is the self-service verification step: the user
    /// must have pre-registered their Discord ID in their Seerr profile.
    pub async fn find_user_by_discord_id(&self, discord_id: &str) -> Result<Option<SeerrUser>> {
        for user in self.get_users().await? {
            let settings = match self.get_user_settings(user.id).await {
                Ok(s) => s,
                Err(e) => {
                    debug!("Could not fetch settings for Seerr user {}: {}", user.id, e);
                    continue;
                }
            };
            if settings.discord_id.as_deref() == Some(discord_id) {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }

    pub async fn find_user_by_username(&self, name: &str) -> Result<Option<SeerrUser>> {
        Ok(self
            .get_users()
            .await?
            .into_iter()
            .find(|u| u.matches_username(name)))
    }

    /// Request statistics for a user, bucketed by status.
    pub async fn request_stats(&self, user_id: u64) -> Result<RequestStats> {
        let page: RequestPage = self
            .http
            .get(self.endpoint(&format!("user/{}/requests?take=100", user_id)))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(bucket_requests(&page.results))
    }

    /// Test if the Seerr API is accessible.
    pub async fn test_connection(&self) -> bool {
        match self.http.get(self.endpoint("status")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Seerr connection test failed: {}", e);
                false
            }
        }
    }
}

fn bucket_requests(entries: &[RequestEntry]) -> RequestStats {
    let mut stats = RequestStats {
        total: entries.len(),
        ..Default::default()
    };
    for entry in entries {
        match entry.status {
            1 => stats.pending += 1,
            2 => stats.approved += 1,
            3 => stats.declined += 1,
            4 => stats.failed += 1,
            5 => stats.completed += 1,
            _ => {}
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: u64) -> SeerrUser {
        SeerrUser {
            id,
            username: None,
            plex_username: None,
            jellyfin_username: None,
            display_name: None,
            email: None,
            permissions: 0,
        }
    }

    #[test]
    fn test_display_name_fallback_chain() {
        let mut u = user(42);
        assert_eq!(u.resolved_username(), "User-42");

        u.email = Some("alice@example.com".to_string());
        assert_eq!(u.resolved_username(), "alice@example.com");

        u.plex_username = Some("alice_plex".to_string());
        assert_eq!(u.resolved_username(), "alice_plex");

        u.username = Some("alice".to_string());
        assert_eq!(u.resolved_username(), "alice");
    }

    #[test]
    fn test_blank_username_falls_through() {
        let mut u = user(42);
        u.username = Some("  ".to_string());
        assert_eq!(u.resolved_username(), "User-42");
    }

    #[test]
    fn test_admin_detection() {
        let owner = user(1);
        assert!(owner.is_admin());

        let mut privileged = user(5);
        assert!(!privileged.is_admin());
        privileged.permissions = PERMISSION_ADMIN;
        assert!(privileged.is_admin());
    }

    #[test]
    fn test_matches_username_case_insensitive() {
        let mut u = user(3);
        u.jellyfin_username = Some("Alice".to_string());
        assert!(u.matches_username("alice"));
        assert!(!u.matches_username("bob"));
    }

    #[test]
    fn test_bucket_requests() {
        let entries: Vec<RequestEntry> = [1, 2, 2, 3, 4, 5, 9]
            .into_iter()
            .map(|status| RequestEntry { status })
            .collect();
        let stats = bucket_requests(&entries);
        assert_eq!(stats.total, 7);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.approved, 2);
        assert_eq!(stats.declined, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.completed, 1);
    }
}
