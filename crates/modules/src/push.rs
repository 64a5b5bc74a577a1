//! Push module (§4.4): bounded-parallel per-token delivery against a mock
//! FCM/APNs-shaped endpoint. There is no real provider variant in scope for
//! this spec, so `PushSender` always runs in mock mode, matching the
//! `PushConfig` type carrying no provider discriminant.

use {
    crate::{parallel, DispatchError, DispatchResult, RecipientPayload, Result, Sender},
    async_trait::async_trait,
    model::{payload::PushMessage, send_config::PushConfig, RecipientId},
};

pub struct PushSender {
    config: PushConfig,
}

impl PushSender {
    pub fn new(config: PushConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Sender for PushSender {
    async fn execute_batch(
        &self,
        items: Vec<(RecipientId, RecipientPayload)>,
    ) -> Result<Vec<DispatchResult>> {
        let items: Vec<(RecipientId, PushMessage)> = items
            .into_iter()
            .map(|(id, payload)| match payload {
                RecipientPayload::Push(message) => Ok((id, message)),
                _ => Err(DispatchError::WrongPayload),
            })
            .collect::<Result<_>>()?;

        parallel::dispatch(&items, self.config.max_parallel as usize, |(_, _message)| {
            Box::pin(async {
                (true, Some(format!("mock-{}", uuid::Uuid::new_v4())), None)
            })
        })
        .await
    }
}
