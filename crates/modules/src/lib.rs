//! Delivery modules (§4.4): one [`Sender`] implementation per module, each
//! unaware of dry-run mode — [`dispatch`] is the single place that branches
//! between a live send and [`dry_run::synthetic_results`], so no module
//! adapter has to remember to special-case it.

pub mod dry_run;
pub mod email;
pub mod error;
pub mod parallel;
pub mod push;
pub mod registry;
pub mod sms;
pub mod webhook;

pub use {error::DispatchError, registry::build_sender};

use {
    async_trait::async_trait,
    model::{
        payload::{EmailMessage, PushMessage, SmsMessage, WebhookMessage},
        RecipientId,
    },
};

pub type Result<T> = std::result::Result<T, DispatchError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchResult {
    pub recipient_id: RecipientId,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// A composed per-recipient message, tagged by module. The worker builds
/// these via `model::payload::build_*` and hands them to whichever
/// [`Sender`] the send-config's module resolved to.
#[derive(Clone, Debug, PartialEq)]
pub enum RecipientPayload {
    Email(EmailMessage),
    Webhook(WebhookMessage),
    Sms(SmsMessage),
    Push(PushMessage),
}

/// A module's live-send implementation. Implementations must not consult
/// dry-run state; [`dispatch`] is the only caller that knows about it.
#[async_trait]
pub trait Sender: Send + Sync {
    async fn execute_batch(
        &self,
        items: Vec<(RecipientId, RecipientPayload)>,
    ) -> Result<Vec<DispatchResult>>;
}

/// Centralized dry-run branch (§4.3 step 5, §4.3 "Dry-run mode"). Rate
/// limiting and idempotency still run around this call in the worker; only
/// the provider call itself is swapped out.
pub async fn dispatch(
    sender: &dyn Sender,
    items: Vec<(RecipientId, RecipientPayload)>,
    dry_run: bool,
) -> Result<Vec<DispatchResult>> {
    if dry_run {
        let ids: Vec<RecipientId> = items.iter().map(|(id, _)| *id).collect();
        Ok(dry_run::synthetic_results(&ids).await)
    } else {
        sender.execute_batch(items).await
    }
}
