//! Deterministic rendering of normalized events into chat-agnostic
//! messages. Rendering never fails: missing fields fall back to
//! placeholders so a sparse payload still produces something deliverable.

use crate::notify::event::{EventKind, NotificationEvent};

pub const COLOR_ORANGE: u32 = 0xE67E22;
pub const COLOR_PURPLE: u32 = 0x9B59B6;
pub const COLOR_RED: u32 = 0xE74C3C;
pub const COLOR_GREEN: u32 = 0x2ECC71;
pub const COLOR_BLUE: u32 = 0x3498DB;
pub const COLOR_GOLD: u32 = 0xF1C40F;
pub const COLOR_GREY: u32 = 0x95A5A6;

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkButton {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// A rendered notification, independent of the chat platform. The
/// messenger translates this into serenity embed and button builders.
#[derive(Debug, Clone)]
pub struct RenderedMessage {
    pub title: String,
    pub description: String,
    pub color: u32,
    pub image_url: Option<String>,
    pub author_name: Option<String>,
    pub author_icon_url: Option<String>,
    pub fields: Vec<EmbedField>,
    pub buttons: Vec<LinkButton>,
}

/// Render an event against a template chosen by its kind.
pub fn render(event: &NotificationEvent, seerr_url: Option<&str>) -> RenderedMessage {
    match &event.kind {
        EventKind::RequestPending => request_message(event, "Pending Approval", COLOR_ORANGE, seerr_url),
        EventKind::RequestAutoApproved | EventKind::RequestApproved => {
            request_message(event, "Processing", COLOR_PURPLE, seerr_url)
        }
        EventKind::RequestDeclined => request_message(event, "Declined", COLOR_RED, seerr_url),
        EventKind::RequestAvailable => request_message(event, "Available", COLOR_GREEN, seerr_url),
        EventKind::RequestFailed => {
            let mut message = request_message(event, "Failed", COLOR_RED, seerr_url);
            if let Some(details) = extra_summary(event) {
                message.fields.push(EmbedField {
                    name: "Error".to_string(),
                    value: details,
                    inline: false,
                });
            }
            message
        }
        EventKind::IssueReported => issue_message(event, COLOR_RED, seerr_url),
        EventKind::IssueComment => issue_message(event, COLOR_BLUE, seerr_url),
        EventKind::IssueResolved => issue_message(event, COLOR_GREEN, seerr_url),
        EventKind::IssueReopened => issue_message(event, COLOR_GOLD, seerr_url),
        EventKind::Test => RenderedMessage {
            title: event
                .event_title
                .clone()
                .unwrap_or_else(|| "Test Notification".to_string()),
            description: event
                .message
                .clone()
                .unwrap_or_else(|| "Test notification received".to_string()),
            color: COLOR_BLUE,
            image_url: None,
            author_name: None,
            author_icon_url: None,
            fields: Vec::new(),
            buttons: Vec::new(),
        },
        EventKind::Unknown(_) => RenderedMessage {
            title: event
                .event_title
                .clone()
                .unwrap_or_else(|| "Notification".to_string()),
            description: media_description(event, seerr_url),
            color: COLOR_GREY,
            image_url: event.image_url.clone(),
            author_name: None,
            author_icon_url: None,
            fields: Vec::new(),
            buttons: Vec::new(),
        },
    }
}

fn request_message(
    event: &NotificationEvent,
    status: &str,
    color: u32,
    seerr_url: Option<&str>,
) -> RenderedMessage {
    let requester = event
        .requested_by
        .username
        .clone()
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut description = media_description(event, seerr_url);
    if let Some(message) = &event.message {
        description = format!("{}\n\n{}", description, message);
    }

    let mut fields = vec![EmbedField {
        name: "Requested By".to_string(),
        value: requester.clone(),
        inline: true,
    }];

    if event.media.is_tv() {
        if let Some(seasons) = requested_seasons(event) {
            fields.push(EmbedField {
                name: "Requested Seasons".to_string(),
                value: seasons,
                inline: true,
            });
        }
    }

    fields.push(EmbedField {
        name: "Request Status".to_string(),
        value: status.to_string(),
        inline: true,
    });

    let buttons = match seerr_url {
        Some(url) => vec![LinkButton {
            label: "View Requests".to_string(),
            url: format!("{}/requests", url),
        }],
        None => Vec::new(),
    };

    RenderedMessage {
        title: event
            .event_title
            .clone()
            .unwrap_or_else(|| "Request Update".to_string()),
        description,
        color,
        image_url: event.image_url.clone(),
        author_name: Some(requester),
        author_icon_url: event.requested_by.avatar.clone(),
        fields,
        buttons,
    }
}

fn issue_message(event: &NotificationEvent, color: u32, seerr_url: Option<&str>) -> RenderedMessage {
    let reporter = event
        .reported_by
        .username
        .clone()
        .unwrap_or_else(|| UNKNOWN.to_string());

    let mut fields = vec![
        EmbedField {
            name: "Issue".to_string(),
            value: event
                .message
                .clone()
                .unwrap_or_else(|| "Unknown issue".to_string()),
            inline: false,
        },
        EmbedField {
            name: "Reported By".to_string(),
            value: reporter.clone(),
            inline: true,
        },
        EmbedField {
            name: "Issue Type".to_string(),
            value: title_case(event.issue.issue_type.as_deref().unwrap_or(UNKNOWN)),
            inline: true,
        },
        EmbedField {
            name: "Issue Status".to_string(),
            value: title_case(event.issue.status.as_deref().unwrap_or(UNKNOWN)),
            inline: true,
        },
    ];

    if event.media.is_tv() {
        if let Some(season) = affected_season(event) {
            fields.push(EmbedField {
                name: "Affected Season".to_string(),
                value: season,
                inline: true,
            });
        }
    }

    if event.kind == EventKind::IssueComment {
        if let (Some(commenter), Some(comment)) =
            (&event.commented_by.username, &event.comment_message)
        {
            fields.push(EmbedField {
                name: format!("Comment from {}", commenter),
                value: comment.clone(),
                inline: false,
            });
        }
    }

    // Comments are attributed to the commenter, everything else to the
    // reporter.
    let (author_name, author_icon_url) = match (&event.commented_by.username, &event.commented_by.avatar) {
        (Some(name), Some(avatar)) => (Some(name.clone()), Some(avatar.clone())),
        _ => (Some(reporter), event.reported_by.avatar.clone()),
    };

    let buttons = match (seerr_url, event.issue.id.as_deref()) {
        (Some(url), Some(issue_id)) => vec![LinkButton {
            label: "View Issue".to_string(),
            url: format!("{}/issues/{}", url, issue_id),
        }],
        _ => Vec::new(),
    };

    RenderedMessage {
        title: event
            .event_title
            .clone()
            .unwrap_or_else(|| "Issue Update".to_string()),
        description: media_description(event, seerr_url),
        color,
        image_url: event.image_url.clone(),
        author_name,
        author_icon_url,
        fields,
        buttons,
    }
}

/// Media title, linked to its Seerr page when we know enough to build one.
fn media_description(event: &NotificationEvent, seerr_url: Option<&str>) -> String {
    let title = event
        .subject
        .clone()
        .unwrap_or_else(|| "Unknown Title".to_string());

    match (seerr_url, event.media.tmdb_id.as_deref()) {
        (Some(url), Some(tmdb_id)) => {
            let kind = if event.media.is_tv() { "tv" } else { "movie" };
            format!("[{}]({}/{}/{})", title, url, kind, tmdb_id)
        }
        _ => title,
    }
}

fn requested_seasons(event: &NotificationEvent) -> Option<String> {
    let seasons: Vec<String> = event
        .extra
        .iter()
        .filter(|item| {
            item.name
                .as_deref()
                .is_some_and(|n| n.to_ascii_lowercase().contains("season"))
        })
        .filter_map(|item| item.value.clone())
        .collect();

    if seasons.is_empty() {
        None
    } else {
        Some(seasons.join(", "))
    }
}

fn affected_season(event: &NotificationEvent) -> Option<String> {
    event
        .extra
        .iter()
        .find(|item| {
            item.name
                .as_deref()
                .is_some_and(|n| n.to_ascii_lowercase().contains("season"))
        })
        .and_then(|item| item.value.clone())
}

fn extra_summary(event: &NotificationEvent) -> Option<String> {
    let lines: Vec<String> = event
        .extra
        .iter()
        .filter_map(|item| match (&item.name, &item.value) {
            (Some(name), Some(value)) => Some(format!("{}: {}", name, value)),
            (None, Some(value)) => Some(value.clone()),
            _ => None,
        })
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::event::NotificationEvent;
    use crate::web::payload::WebhookPayload;

    fn event_from(json: &[u8]) -> NotificationEvent {
        NotificationEvent::from_payload(&WebhookPayload::parse(json).unwrap())
    }

    #[test]
    fn test_empty_payload_renders_with_placeholders() {
        let event = event_from(b"{}");
        let message = render(&event, Some("https://seerr.example"));

        assert_eq!(message.title, "Notification");
        assert_eq!(message.description, "Unknown Title");
        assert!(message.image_url.is_none());
        assert!(message.buttons.is_empty());
    }

    #[test]
    fn test_available_request_renders_green_with_button() {
        let event = event_from(
            br#"{
                "notification_type": "MEDIA_AVAILABLE",
                "event": "Movie Request Now Available",
                "subject": "Dune: Part Two (2024)",
                "message": "Your request is now available!",
                "image": "https://image.tmdb.org/t/p/w600/poster.jpg",
                "media_type": "movie",
                "media_tmdbid": "693134",
                "requestedBy_username": "alice"
            }"#,
        );
        let message = render(&event, Some("https://seerr.example"));

        assert_eq!(message.title, "Movie Request Now Available");
        assert_eq!(message.color, COLOR_GREEN);
        assert!(message
            .description
            .starts_with("[Dune: Part Two (2024)](https://seerr.example/movie/693134)"));
        assert_eq!(message.author_name.as_deref(), Some("alice"));
        assert_eq!(
            message.buttons,
            vec![LinkButton {
                label: "View Requests".to_string(),
                url: "https://seerr.example/requests".to_string(),
            }]
        );
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "Request Status" && f.value == "Available"));
    }

    #[test]
    fn test_tv_request_lists_seasons() {
        let event = event_from(
            br#"{
                "notification_type": "MEDIA_APPROVED",
                "subject": "Severance",
                "media_type": "tv",
                "extra": [{"name": "Requested Seasons", "value": "1, 2"}]
            }"#,
        );
        let message = render(&event, None);

        assert_eq!(message.color, COLOR_PURPLE);
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "Requested Seasons" && f.value == "1, 2"));
        // No Seerr URL, no link, no button.
        assert_eq!(message.description, "Severance");
        assert!(message.buttons.is_empty());
    }

    #[test]
    fn test_failed_request_carries_error_details() {
        let event = event_from(
            br#"{
                "notification_type": "MEDIA_FAILED",
                "subject": "Alien: Romulus",
                "extra": [{"name": "Reason", "value": "No matching release found"}]
            }"#,
        );
        let message = render(&event, Some("https://seerr.example"));

        assert_eq!(message.color, COLOR_RED);
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "Error" && f.value.contains("No matching release found")));
    }

    #[test]
    fn test_issue_renders_view_issue_button() {
        let event = event_from(
            br#"{
                "notification_type": "ISSUE_CREATED",
                "subject": "The Bear",
                "message": "Audio out of sync in S02E03",
                "issue_id": "17",
                "issue_type": "audio",
                "issue_status": "open",
                "reportedBy_username": "bob"
            }"#,
        );
        let message = render(&event, Some("https://seerr.example"));

        assert_eq!(message.color, COLOR_RED);
        assert_eq!(message.author_name.as_deref(), Some("bob"));
        assert_eq!(
            message.buttons,
            vec![LinkButton {
                label: "View Issue".to_string(),
                url: "https://seerr.example/issues/17".to_string(),
            }]
        );
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "Issue Type" && f.value == "Audio"));
    }

    #[test]
    fn test_issue_without_id_has_no_button() {
        let event = event_from(br#"{"notification_type": "ISSUE_RESOLVED"}"#);
        let message = render(&event, Some("https://seerr.example"));
        assert_eq!(message.color, COLOR_GREEN);
        assert!(message.buttons.is_empty());
    }

    #[test]
    fn test_issue_comment_includes_comment_field() {
        let event = event_from(
            br#"{
                "notification_type": "ISSUE_COMMENT",
                "subject": "The Bear",
                "commentedBy_username": "carol",
                "comment_message": "Fixed in the latest remux."
            }"#,
        );
        let message = render(&event, None);

        assert_eq!(message.color, COLOR_BLUE);
        assert!(message
            .fields
            .iter()
            .any(|f| f.name == "Comment from carol" && f.value == "Fixed in the latest remux."));
    }

    #[test]
    fn test_unknown_event_degrades_to_generic_template() {
        let event = event_from(
            br#"{"notification_type": "MEDIA_SOMETHING_NEW", "event": "New Thing", "subject": "A Title"}"#,
        );
        let message = render(&event, None);

        assert_eq!(message.title, "New Thing");
        assert_eq!(message.description, "A Title");
        assert_eq!(message.color, COLOR_GREY);
        assert!(message.buttons.is_empty());
    }
}
