use {
    super::{Normalized, ParseError},
    chrono::{DateTime, Utc},
    model::EventType,
    serde::Deserialize,
};

/// The SNS envelope. `Message` is itself stringified JSON, per spec §6.
#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "Type")]
    envelope_type: String,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "SubscribeURL")]
    subscribe_url: Option<String>,
}

#[derive(Deserialize)]
struct Notification {
    #[serde(rename = "eventType")]
    event_type: String,
    mail: Mail,
    bounce: Option<Bounce>,
}

#[derive(Deserialize)]
struct Mail {
    #[serde(rename = "messageId")]
    message_id: String,
    timestamp: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct Bounce {
    #[serde(rename = "bounceType")]
    bounce_type: String,
}

pub enum Action {
    /// `SubscriptionConfirmation`: caller must GET this URL to complete the
    /// SNS handshake (spec §6).
    ConfirmSubscription(String),
    /// `UnsubscribeConfirmation`: acknowledged, nothing else to do.
    Unsubscribed,
    Event(Normalized),
}

pub fn parse(body: &[u8]) -> Result<Action, ParseError> {
    let envelope: Envelope = serde_json::from_slice(body)?;
    match envelope.envelope_type.as_str() {
        "SubscriptionConfirmation" => Ok(Action::ConfirmSubscription(
            envelope.subscribe_url.ok_or(ParseError::MissingSubscribeUrl)?,
        )),
        "UnsubscribeConfirmation" => Ok(Action::Unsubscribed),
        _ => {
            let message = envelope.message.ok_or(ParseError::MissingMessage)?;
            let notification: Notification = serde_json::from_str(&message)?;
            Ok(Action::Event(normalize(notification)))
        }
    }
}

fn normalize(notification: Notification) -> Normalized {
    let event_type = match notification.event_type.as_str() {
        "Delivery" => EventType::Delivered,
        "Bounce" => match notification.bounce.as_ref().map(|b| b.bounce_type.as_str()) {
            Some("Permanent") => EventType::Bounced,
            Some("Transient") => EventType::SoftBounced,
            _ => EventType::Bounced,
        },
        "Complaint" => EventType::Complained,
        _ => EventType::Failed,
    };
    Normalized {
        event_type,
        provider_message_id: notification.mail.message_id,
        timestamp: notification.mail.timestamp.unwrap_or_else(Utc::now),
        metadata: serde_json::json!({ "sesEventType": notification.event_type }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_confirmation_is_recognized() {
        let body = br#"{"Type":"SubscriptionConfirmation","SubscribeURL":"https://example.com/confirm"}"#;
        match parse(body).unwrap() {
            Action::ConfirmSubscription(url) => assert_eq!(url, "https://example.com/confirm"),
            _ => panic!("expected ConfirmSubscription"),
        }
    }

    #[test]
    fn permanent_bounce_maps_to_bounced() {
        let message = r#"{"eventType":"Bounce","mail":{"messageId":"m-1"},"bounce":{"bounceType":"Permanent"}}"#;
        let body = format!(r#"{{"Type":"Notification","Message":{}}}"#, serde_json::to_string(message).unwrap());
        match parse(body.as_bytes()).unwrap() {
            Action::Event(normalized) => {
                assert_eq!(normalized.event_type, EventType::Bounced);
                assert_eq!(normalized.provider_message_id, "m-1");
            }
            _ => panic!("expected Event"),
        }
    }

    #[test]
    fn transient_bounce_maps_to_soft_bounced() {
        let message = r#"{"eventType":"Bounce","mail":{"messageId":"m-2"},"bounce":{"bounceType":"Transient"}}"#;
        let body = format!(r#"{{"Type":"Notification","Message":{}}}"#, serde_json::to_string(message).unwrap());
        match parse(body.as_bytes()).unwrap() {
            Action::Event(normalized) => assert_eq!(normalized.event_type, EventType::SoftBounced),
            _ => panic!("expected Event"),
        }
    }
}
