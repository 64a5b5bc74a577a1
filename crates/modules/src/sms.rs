//! SMS module (§4.4): Telnyx has no batch send endpoint, so dispatch is
//! bounded-parallel per `maxParallel`; `Mock` is used by tests and dry-run
//! comparisons.

use {
    crate::{parallel, DispatchError, DispatchResult, RecipientPayload, Result, Sender},
    async_trait::async_trait,
    model::{
        payload::SmsMessage,
        send_config::{SmsConfig, SmsProvider},
        RecipientId,
    },
};

pub struct SmsSender {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsSender {
    pub fn new(config: SmsConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Sender for SmsSender {
    async fn execute_batch(
        &self,
        items: Vec<(RecipientId, RecipientPayload)>,
    ) -> Result<Vec<DispatchResult>> {
        let items: Vec<(RecipientId, SmsMessage)> = items
            .into_iter()
            .map(|(id, payload)| match payload {
                RecipientPayload::Sms(message) => Ok((id, message)),
                _ => Err(DispatchError::WrongPayload),
            })
            .collect::<Result<_>>()?;

        match self.config.provider {
            SmsProvider::Mock => Ok(items
                .into_iter()
                .map(|(recipient_id, _)| DispatchResult {
                    recipient_id,
                    success: true,
                    provider_message_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
                    error: None,
                })
                .collect()),
            SmsProvider::Telnyx => {
                parallel::dispatch(&items, self.config.max_parallel as usize, |(_, message)| {
                    Box::pin(self.send_one(message))
                })
                .await
            }
        }
    }
}

impl SmsSender {
    async fn send_one(&self, message: &SmsMessage) -> (bool, Option<String>, Option<String>) {
        #[derive(serde::Serialize)]
        struct TelnyxRequest<'a> {
            from: &'a str,
            to: &'a str,
            text: &'a str,
        }
        #[derive(serde::Deserialize)]
        struct TelnyxResponse {
            data: TelnyxData,
        }
        #[derive(serde::Deserialize)]
        struct TelnyxData {
            id: String,
        }

        let response = self
            .client
            .post("https://api.telnyx.com/v2/messages")
            .bearer_auth(&self.config.api_key_ref)
            .json(&TelnyxRequest {
                from: &self.config.from_number,
                to: &message.to,
                text: &message.message,
            })
            .send()
            .await;

        match response {
            Ok(r) if r.status().is_success() => match r.json::<TelnyxResponse>().await {
                Ok(parsed) => (true, Some(parsed.data.id), None),
                Err(err) => (false, None, Some(err.to_string())),
            },
            Ok(r) => (false, None, Some(format!("telnyx call failed: {}", r.status()))),
            Err(err) => (false, None, Some(err.to_string())),
        }
    }
}
