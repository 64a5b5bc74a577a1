use {
    super::{Normalized, ParseError},
    chrono::Utc,
    model::EventType,
};

const KEYWORDS: [(&str, EventType); 7] = [
    ("delivered", EventType::Delivered),
    ("bounced", EventType::Bounced),
    ("failed", EventType::Failed),
    ("sent", EventType::Sent),
    ("opened", EventType::Opened),
    ("clicked", EventType::Clicked),
    ("complained", EventType::Complained),
];

/// Custom modules have no fixed schema, so this pattern-matches on the
/// string found under `event` (spec §4.7: "pattern-match on the string").
/// `messageId` is read from any of a few common key spellings.
pub fn parse(body: &[u8]) -> Result<Normalized, ParseError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    let event_field = value.get("event").and_then(|v| v.as_str()).unwrap_or("").to_lowercase();
    let provider_message_id = ["messageId", "message_id", "id"]
        .iter()
        .find_map(|key| value.get(*key).and_then(|v| v.as_str()))
        .ok_or(ParseError::MissingMessageId)?
        .to_owned();
    Ok(Normalized {
        event_type: map_event_type(&event_field),
        provider_message_id,
        timestamp: Utc::now(),
        metadata: serde_json::json!({ "rawEventField": event_field }),
    })
}

fn map_event_type(event: &str) -> EventType {
    KEYWORDS
        .iter()
        .find(|(needle, _)| event.contains(needle))
        .map(|(_, kind)| *kind)
        .unwrap_or(EventType::CustomEvent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognized_keyword_maps_directly() {
        assert_eq!(map_event_type("message_delivered"), EventType::Delivered);
        assert_eq!(map_event_type("sms.complained"), EventType::Complained);
    }

    #[test]
    fn unrecognized_string_falls_back_to_custom_event() {
        assert_eq!(map_event_type("wobbled"), EventType::CustomEvent);
    }

    #[test]
    fn missing_message_id_is_an_error() {
        let body = br#"{"event":"delivered"}"#;
        assert!(matches!(parse(body), Err(ParseError::MissingMessageId)));
    }

    #[test]
    fn accepts_alternate_id_key_spellings() {
        let body = br#"{"event":"delivered","message_id":"m-1"}"#;
        let normalized = parse(body).unwrap();
        assert_eq!(normalized.provider_message_id, "m-1");
    }
}
