//! Webhook module (§4.4): a single HTTP request carries every payload in
//! the chunk as `{"recipients": [...]}`. A `results` array in the response
//! gives per-recipient outcomes; otherwise every payload in the request
//! shares the call's own success/failure. Retries (0–10) wrap that one
//! request, never a per-recipient re-dispatch.

use {
    crate::{DispatchError, DispatchResult, RecipientPayload, Result, Sender},
    async_trait::async_trait,
    model::{payload::WebhookMessage, send_config::WebhookConfig, RecipientId},
    serde::{Deserialize, Serialize},
};

pub struct WebhookSender {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookSender {
    pub fn new(config: WebhookConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[derive(Serialize)]
struct RequestBody<'a> {
    recipients: Vec<&'a serde_json::Value>,
}

#[derive(Deserialize, Default)]
struct ResultsEnvelope {
    #[serde(default)]
    results: Vec<PerRecipientResult>,
}

#[derive(Deserialize)]
struct PerRecipientResult {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl Sender for WebhookSender {
    async fn execute_batch(
        &self,
        items: Vec<(RecipientId, RecipientPayload)>,
    ) -> Result<Vec<DispatchResult>> {
        let items: Vec<(RecipientId, WebhookMessage)> = items
            .into_iter()
            .map(|(id, payload)| match payload {
                RecipientPayload::Webhook(message) => Ok((id, message)),
                _ => Err(DispatchError::WrongPayload),
            })
            .collect::<Result<_>>()?;

        if items.is_empty() {
            return Ok(Vec::new());
        }

        let body = RequestBody {
            recipients: items.iter().map(|(_, m)| &m.body).collect(),
        };
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();
        let timeout = std::time::Duration::from_secs(self.config.timeout_secs as u64);

        let mut attempts_left = self.config.retry_count + 1;
        loop {
            attempts_left -= 1;
            let mut request = self
                .client
                .request(
                    self.config.method.parse().unwrap_or(reqwest::Method::POST),
                    self.config.url.clone(),
                )
                .timeout(timeout)
                .header("content-type", "application/json")
                .body(body_bytes.clone());
            if let Some(secret) = &self.config.webhook_secret {
                request = request.header(self.config.signature_header.as_str(), sign(secret, &body_bytes));
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    let envelope: ResultsEnvelope = response.json().await.unwrap_or_default();
                    return Ok(apply_results(items, envelope));
                }
                Ok(response) if attempts_left == 0 => {
                    let error = format!("webhook call failed: {}", response.status());
                    return Ok(all_failed(items, error));
                }
                Err(err) if attempts_left == 0 => return Ok(all_failed(items, err.to_string())),
                _ => continue,
            }
        }
    }
}

fn apply_results(
    items: Vec<(RecipientId, WebhookMessage)>,
    envelope: ResultsEnvelope,
) -> Vec<DispatchResult> {
    if envelope.results.len() != items.len() {
        return items
            .into_iter()
            .map(|(recipient_id, _)| DispatchResult {
                recipient_id,
                success: true,
                provider_message_id: None,
                error: None,
            })
            .collect();
    }
    items
        .into_iter()
        .zip(envelope.results)
        .map(|((recipient_id, _), result)| DispatchResult {
            recipient_id,
            success: result.success,
            provider_message_id: None,
            error: result.error,
        })
        .collect()
}

fn all_failed(items: Vec<(RecipientId, WebhookMessage)>, error: String) -> Vec<DispatchResult> {
    items
        .into_iter()
        .map(|(recipient_id, _)| DispatchResult {
            recipient_id,
            success: false,
            provider_message_id: None,
            error: Some(error.clone()),
        })
        .collect()
}

fn sign(secret: &str, body: &[u8]) -> String {
    use hmac::{Hmac, Mac};
    let mut mac =
        Hmac::<sha2::Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic() {
        let body = b"{\"a\":1}";
        assert_eq!(sign("secret", body), sign("secret", body));
        assert_ne!(sign("secret", body), sign("other", body));
    }

    #[test]
    fn mismatched_results_length_falls_back_to_call_outcome() {
        let id = RecipientId::new();
        let message = WebhookMessage {
            recipient_url_or_id: "x".into(),
            body: serde_json::json!({}),
            variables: Default::default(),
        };
        let results = apply_results(vec![(id, message)], ResultsEnvelope { results: vec![] });
        assert!(results[0].success);
    }
}
