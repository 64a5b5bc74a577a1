use {
    super::{Normalized, ParseError},
    chrono::{DateTime, Utc},
    model::EventType,
    serde::Deserialize,
};

#[derive(Deserialize)]
struct Payload {
    data: Data,
}

#[derive(Deserialize)]
struct Data {
    event_type: String,
    occurred_at: Option<DateTime<Utc>>,
    payload: InnerPayload,
}

#[derive(Deserialize)]
struct InnerPayload {
    id: String,
    status: Option<String>,
}

pub fn parse(body: &[u8]) -> Result<Normalized, ParseError> {
    let payload: Payload = serde_json::from_slice(body)?;
    let event_type = match payload.data.event_type.as_str() {
        "message.finalized" if payload.data.payload.status.as_deref() == Some("delivered") => {
            EventType::Delivered
        }
        "message.finalized" => EventType::Failed,
        "message.sent" => EventType::Sent,
        _ => EventType::Failed,
    };
    Ok(Normalized {
        event_type,
        provider_message_id: payload.data.payload.id,
        timestamp: payload.data.occurred_at.unwrap_or_else(Utc::now),
        metadata: serde_json::json!({ "telnyxEventType": payload.data.event_type }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalized_delivered_maps_to_delivered() {
        let body = br#"{"data":{"event_type":"message.finalized","payload":{"id":"m-1","status":"delivered"}}}"#;
        let normalized = parse(body).unwrap();
        assert_eq!(normalized.event_type, EventType::Delivered);
    }

    #[test]
    fn finalized_non_delivered_maps_to_failed() {
        let body = br#"{"data":{"event_type":"message.finalized","payload":{"id":"m-1","status":"failed"}}}"#;
        let normalized = parse(body).unwrap();
        assert_eq!(normalized.event_type, EventType::Failed);
    }

    #[test]
    fn sent_maps_to_sent() {
        let body = br#"{"data":{"event_type":"message.sent","payload":{"id":"m-1"}}}"#;
        let normalized = parse(body).unwrap();
        assert_eq!(normalized.event_type, EventType::Sent);
    }
}
