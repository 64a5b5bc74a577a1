//! Per-provider payload parsing and event-type mapping (§4.7's required
//! mapping table). Each provider module exposes a `parse` free function so
//! the intake handlers stay thin dispatch shims.
pub mod custom;
pub mod resend;
pub mod ses;
pub mod telnyx;

use {
    chrono::{DateTime, Utc},
    model::EventType,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed json body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ses SubscriptionConfirmation missing SubscribeURL")]
    MissingSubscribeUrl,
    #[error("ses envelope missing Message field")]
    MissingMessage,
    #[error("custom payload has no recognizable message id field")]
    MissingMessageId,
}

/// A provider payload reduced to what the gateway needs to build a
/// [`model::WebhookEvent`]. `metadata` carries provider-specific extras worth
/// keeping queryable without re-parsing `rawEvent`.
pub struct Normalized {
    pub event_type: EventType,
    pub provider_message_id: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}
