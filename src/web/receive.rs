//! Authentication and normalization of inbound webhook calls, kept free of
//! HTTP framework types so the whole path is testable.

use crate::error::{BotError, Result};
use crate::notify::event::NotificationEvent;
use crate::web::payload::WebhookPayload;

/// Validate and normalize one webhook delivery.
///
/// When a shared secret is configured the provided `Authorization` header
/// must match it exactly; no configured secret disables the check. The
/// body is then parsed into a normalized event; unknown notification
/// types pass through rather than erroring.
pub fn receive(
    configured_secret: Option<&str>,
    auth_header: Option<&str>,
    raw_body: &[u8],
) -> Result<NotificationEvent> {
    if let Some(secret) = configured_secret {
        match auth_header {
            Some(provided) if constant_time_eq(provided.as_bytes(), secret.as_bytes()) => {}
            _ => return Err(BotError::WebhookAuth),
        }
    }

    let payload = WebhookPayload::parse(raw_body)?;
    Ok(NotificationEvent::from_payload(&payload))
}

/// Compare without early exit so the secret check leaks no timing signal.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::event::EventKind;

    #[test]
    fn test_no_configured_secret_disables_auth() {
        let event = receive(None, None, b"{}").unwrap();
        assert!(matches!(event.kind, EventKind::Unknown(_)));
    }

    #[test]
    fn test_matching_secret_passes() {
        let event = receive(
            Some("s3cret"),
            Some("s3cret"),
            br#"{"notification_type": "MEDIA_AVAILABLE"}"#,
        )
        .unwrap();
        assert_eq!(event.kind, EventKind::RequestAvailable);
    }

    #[test]
    fn test_wrong_or_missing_header_is_auth_error() {
        let err = receive(Some("s3cret"), Some("wrong"), b"{}").unwrap_err();
        assert!(matches!(err, BotError::WebhookAuth));

        let err = receive(Some("s3cret"), None, b"{}").unwrap_err();
        assert!(matches!(err, BotError::WebhookAuth));
    }

    #[test]
    fn test_malformed_body_is_parse_error() {
        let err = receive(None, None, b"[not, an, object").unwrap_err();
        assert!(matches!(err, BotError::WebhookParse { .. }));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }
}
