use {
    super::{Normalized, ParseError},
    chrono::{DateTime, Utc},
    model::EventType,
    serde::Deserialize,
};

#[derive(Deserialize)]
struct Payload {
    #[serde(rename = "type")]
    event_type: String,
    created_at: Option<DateTime<Utc>>,
    data: Data,
}

#[derive(Deserialize)]
struct Data {
    email_id: String,
}

/// Verifies the `svix-signature` header: space-separated `v1,<base64>`
/// tokens (Svix supports secret rotation via multiple concurrent
/// signatures), any of which matching is sufficient. Message is
/// `"{timestamp}.{body}"` per spec §6.
pub fn verify(secret: &str, timestamp: &str, body: &[u8], signature_header: &str) -> bool {
    let mut message = Vec::with_capacity(timestamp.len() + 1 + body.len());
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'.');
    message.extend_from_slice(body);

    signature_header
        .split_whitespace()
        .filter_map(|token| token.rsplit_once(','))
        .any(|(_, sig)| crate::signature::verify_base64(secret.as_bytes(), &message, sig))
}

pub fn parse(body: &[u8]) -> Result<Normalized, ParseError> {
    let payload: Payload = serde_json::from_slice(body)?;
    Ok(Normalized {
        event_type: map_event_type(&payload.event_type),
        provider_message_id: payload.data.email_id,
        timestamp: payload.created_at.unwrap_or_else(Utc::now),
        metadata: serde_json::json!({ "resendEventType": payload.event_type }),
    })
}

fn map_event_type(raw: &str) -> EventType {
    match raw {
        "email.delivered" => EventType::Delivered,
        "email.bounced" => EventType::Bounced,
        "email.complained" => EventType::Complained,
        "email.opened" => EventType::Opened,
        "email.clicked" => EventType::Clicked,
        _ => EventType::Failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_event_types() {
        assert_eq!(map_event_type("email.delivered"), EventType::Delivered);
        assert_eq!(map_event_type("email.bounced"), EventType::Bounced);
        assert_eq!(map_event_type("email.something_new"), EventType::Failed);
    }

    #[test]
    fn parses_minimal_payload() {
        let body = br#"{"type":"email.delivered","data":{"email_id":"msg-1"}}"#;
        let normalized = parse(body).unwrap();
        assert_eq!(normalized.event_type, EventType::Delivered);
        assert_eq!(normalized.provider_message_id, "msg-1");
    }

    #[test]
    fn signature_verification_accepts_any_matching_token() {
        use {
            base64::Engine,
            hmac::{Hmac, Mac},
            sha2::Sha256,
        };

        let secret = "whsec_test";
        let timestamp = "1700000000";
        let body = b"{}";
        let mut message = Vec::new();
        message.extend_from_slice(timestamp.as_bytes());
        message.push(b'.');
        message.extend_from_slice(body);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(&message);
        let good = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());

        let header = format!("v1,bad-sig v1,{good}");
        assert!(verify(secret, timestamp, body, &header));
        assert!(!verify("other-secret", timestamp, body, &header));
    }
}
