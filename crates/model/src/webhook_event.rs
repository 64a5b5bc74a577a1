use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    sha2::{Digest, Sha256},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Resend,
    Ses,
    Telnyx,
    Custom,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Resend => "resend",
            Provider::Ses => "ses",
            Provider::Telnyx => "telnyx",
            Provider::Custom => "custom",
        }
    }
}

/// Normalized delivery-event kind, after provider-specific mapping (§4.7).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Delivered,
    Bounced,
    SoftBounced,
    Complained,
    Opened,
    Clicked,
    Sent,
    Failed,
    /// Custom modules that emit a recognizable-but-unmapped string.
    CustomEvent,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Delivered => "delivered",
            EventType::Bounced => "bounced",
            EventType::SoftBounced => "soft_bounced",
            EventType::Complained => "complained",
            EventType::Opened => "opened",
            EventType::Clicked => "clicked",
            EventType::Sent => "sent",
            EventType::Failed => "failed",
            EventType::CustomEvent => "custom.event",
        }
    }
}

/// Normalized inbound provider delivery notification.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WebhookEvent {
    pub id: String,
    pub provider: Provider,
    pub event_type: EventType,
    pub provider_message_id: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub raw_event: serde_json::Value,
    pub module_id: Option<String>,
}

impl WebhookEvent {
    /// Deterministic id from `(provider, providerMessageId, eventType)`.
    /// Timestamps MUST NOT participate (§4.7 step 3) or two deliveries of
    /// the same logical event could mint different bus `msgId`s and defeat
    /// layer-1 dedup.
    pub fn compute_id(provider: Provider, provider_message_id: &str, event_type: EventType) -> String {
        let mut hasher = Sha256::new();
        hasher.update(provider.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(provider_message_id.as_bytes());
        hasher.update(b"|");
        hasher.update(event_type.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn subject(&self) -> String {
        format!("webhook.{}.{}", self.provider.as_str(), self.event_type.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic_and_ignores_timestamp() {
        let a = WebhookEvent::compute_id(Provider::Resend, "msg-1", EventType::Delivered);
        let b = WebhookEvent::compute_id(Provider::Resend, "msg-1", EventType::Delivered);
        assert_eq!(a, b);
    }

    #[test]
    fn id_differs_by_event_type() {
        let a = WebhookEvent::compute_id(Provider::Resend, "msg-1", EventType::Delivered);
        let b = WebhookEvent::compute_id(Provider::Resend, "msg-1", EventType::Bounced);
        assert_ne!(a, b);
    }
}
