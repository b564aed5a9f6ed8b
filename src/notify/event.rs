//! Normalized notification events.
//!
//! A `NotificationEvent` is built per webhook call and never persisted.
//! Unknown notification types are carried through as `Unknown` so upstream
//! schema additions degrade to a generic notification instead of an error.

use crate::web::payload::{ExtraItem, WebhookPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    RequestPending,
    RequestAutoApproved,
    RequestApproved,
    RequestDeclined,
    RequestAvailable,
    RequestFailed,
    IssueReported,
    IssueComment,
    IssueResolved,
    IssueReopened,
    Test,
    Unknown(String),
}

impl EventKind {
    pub fn from_notification_type(raw: &str) -> Self {
        match raw {
            "MEDIA_PENDING" => EventKind::RequestPending,
            "MEDIA_AUTO_APPROVED" => EventKind::RequestAutoApproved,
            "MEDIA_APPROVED" => EventKind::RequestApproved,
            "MEDIA_DECLINED" => EventKind::RequestDeclined,
            "MEDIA_AVAILABLE" => EventKind::RequestAvailable,
            "MEDIA_FAILED" => EventKind::RequestFailed,
            "ISSUE_CREATED" => EventKind::IssueReported,
            "ISSUE_COMMENT" => EventKind::IssueComment,
            "ISSUE_RESOLVED" => EventKind::IssueResolved,
            "ISSUE_REOPENED" => EventKind::IssueReopened,
            "TEST_NOTIFICATION" => EventKind::Test,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn is_request(&self) -> bool {
        matches!(
            self,
            EventKind::RequestPending
                | EventKind::RequestAutoApproved
                | EventKind::RequestApproved
                | EventKind::RequestDeclined
                | EventKind::RequestAvailable
                | EventKind::RequestFailed
        )
    }

    pub fn is_issue(&self) -> bool {
        matches!(
            self,
            EventKind::IssueReported
                | EventKind::IssueComment
                | EventKind::IssueResolved
                | EventKind::IssueReopened
        )
    }

    /// Whether the event is addressed to the requesting user. Pending,
    /// auto-approved and failed requests are admin notifications and stay
    /// in the shared channel.
    pub fn notifies_requester(&self) -> bool {
        matches!(
            self,
            EventKind::RequestApproved | EventKind::RequestDeclined | EventKind::RequestAvailable
        )
    }
}

/// A user reference embedded in the payload.
#[derive(Debug, Clone, Default)]
pub struct Person {
    pub username: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct MediaInfo {
    pub media_type: Option<String>,
    pub tmdb_id: Option<String>,
    pub tvdb_id: Option<String>,
    pub status: Option<String>,
}

impl MediaInfo {
    pub fn is_tv(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case("tv"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct IssueInfo {
    pub id: Option<String>,
    pub issue_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NotificationEvent {
    pub kind: EventKind,
    pub event_title: Option<String>,
    pub subject: Option<String>,
    pub message: Option<String>,
    pub image_url: Option<String>,

    pub requested_by: Person,
    pub reported_by: Person,
    pub commented_by: Person,
    pub comment_message: Option<String>,

    /// Discord ID of the user this event should be delivered to, taken
    /// from the payload field appropriate for the event kind. Presence
    /// does not imply a link exists; the dispatcher validates that.
    pub target_discord_id: Option<String>,

    pub media: MediaInfo,
    pub issue: IssueInfo,
    pub extra: Vec<ExtraItem>,
}

impl NotificationEvent {
    pub fn from_payload(payload: &WebhookPayload) -> Self {
        let kind = payload
            .notification_type
            .as_deref()
            .map(EventKind::from_notification_type)
            .unwrap_or_else(|| EventKind::Unknown("unspecified".to_string()));

        let target_discord_id = match kind {
            // Request outcomes notify the requesting user.
            EventKind::RequestApproved
            | EventKind::RequestDeclined
            | EventKind::RequestAvailable
            | EventKind::Test => payload.notifyuser_discord_id.clone(),
            // Issue resolution notifies the reporter, comments notify the
            // commenter's counterpart.
            EventKind::IssueResolved | EventKind::IssueReopened => {
                payload.reported_by_discord_id.clone()
            }
            EventKind::IssueComment => payload.commented_by_discord_id.clone(),
            // Pending/auto-approved/failed are admin notifications.
            _ => None,
        };

        Self {
            kind,
            event_title: payload.event.clone(),
            subject: payload.subject.clone(),
            message: payload.message.clone(),
            image_url: payload.image.clone(),
            requested_by: Person {
                username: payload.requested_by_username.clone(),
                avatar: payload.requested_by_avatar.clone(),
            },
            reported_by: Person {
                username: payload.reported_by_username.clone(),
                avatar: payload.reported_by_avatar.clone(),
            },
            commented_by: Person {
                username: payload.commented_by_username.clone(),
                avatar: payload.commented_by_avatar.clone(),
            },
            comment_message: payload.comment_message.clone(),
            target_discord_id,
            media: MediaInfo {
                media_type: payload.media_type.clone(),
                tmdb_id: payload.media_tmdbid.clone(),
                tvdb_id: payload.media_tvdbid.clone(),
                status: payload.media_status.clone(),
            },
            issue: IssueInfo {
                id: payload.issue_id.clone(),
                issue_type: payload.issue_type.clone(),
                status: payload.issue_status.clone(),
            },
            extra: payload.extra.clone(),
        }
    }
}
