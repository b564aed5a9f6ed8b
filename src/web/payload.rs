//! Raw Seerr webhook payload.
//!
//! Every field is template-substituted upstream and may be missing, empty,
//! or (for ids) a bare number. Parsing must tolerate all of that: absent
//! fields become `None`, never an error.

use serde::{Deserialize, Deserializer};

use crate::error::{BotError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookPayload {
    pub notification_type: Option<String>,
    pub event: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub image: Option<String>,

    pub media_type: Option<String>,
    #[serde(deserialize_with = "stringish")]
    pub media_tmdbid: Option<String>,
    #[serde(deserialize_with = "stringish")]
    pub media_tvdbid: Option<String>,
    pub media_status: Option<String>,

    #[serde(rename = "requestedBy_username")]
    pub requested_by_username: Option<String>,
    #[serde(rename = "requestedBy_avatar")]
    pub requested_by_avatar: Option<String>,

    #[serde(rename = "notifyuser_username")]
    pub notifyuser_username: Option<String>,
    #[serde(rename = "notifyuser_settings_discordId", deserialize_with = "stringish")]
    pub notifyuser_discord_id: Option<String>,

    #[serde(deserialize_with = "stringish")]
    pub issue_id: Option<String>,
    pub issue_type: Option<String>,
    pub issue_status: Option<String>,

    #[serde(rename = "reportedBy_username")]
    pub reported_by_username: Option<String>,
    #[serde(rename = "reportedBy_avatar")]
    pub reported_by_avatar: Option<String>,
    #[serde(rename = "reportedBy_settings_discordId", deserialize_with = "stringish")]
    pub reported_by_discord_id: Option<String>,

    #[serde(rename = "commentedBy_username")]
    pub commented_by_username: Option<String>,
    #[serde(rename = "commentedBy_avatar")]
    pub commented_by_avatar: Option<String>,
    #[serde(rename = "commentedBy_settings_discordId", deserialize_with = "stringish")]
    pub commented_by_discord_id: Option<String>,

    pub comment_message: Option<String>,

    #[serde(deserialize_with = "extra_items")]
    pub extra: Vec<ExtraItem>,
}

/// One `{name, value}` entry from the payload's `extra` array (requested
/// seasons, failure details, and the like).
#[derive(Debug, Clone, Deserialize)]
pub struct ExtraItem {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "stringish")]
    pub value: Option<String>,
}

impl WebhookPayload {
    pub fn parse(raw: &[u8]) -> Result<Self> {
        serde_json::from_slice(raw).map_err(|e| BotError::WebhookParse {
            message: e.to_string(),
        })
    }
}

/// Accept a string or a bare number where Seerr's templates are loose
/// about types; anything else collapses to `None`.
fn stringish<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// `extra` should be an array of `{name, value}` objects, but tolerate any
/// other shape by dropping what does not fit.
fn extra_items<'de, D>(deserializer: D) -> std::result::Result<Vec<ExtraItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let serde_json::Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}
