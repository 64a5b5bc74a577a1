pub mod batch;
pub mod ids;
pub mod module;
pub mod payload;
pub mod recipient;
pub mod send_config;
pub mod webhook_event;
pub mod wire;

pub use {
    batch::{Batch, BatchPayload, BatchStatus},
    ids::{BatchId, RecipientId, SendConfigId, UserId},
    module::Module,
    recipient::{Recipient, RecipientStatus},
    send_config::{RateLimit, SendConfig, SendConfigPayload},
    webhook_event::{EventType, Provider, WebhookEvent},
};
