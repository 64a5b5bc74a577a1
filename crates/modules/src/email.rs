//! Email module (§4.4): uses the provider's true batch endpoint where
//! available (Resend ≤100, SES ≤50); `Mock` never makes a network call and
//! is what S1/S4's scenarios dispatch against.

use {
    crate::{DispatchError, DispatchResult, RecipientPayload, Result, Sender},
    async_trait::async_trait,
    model::{
        payload::EmailMessage,
        send_config::{EmailConfig, EmailProvider},
        RecipientId,
    },
};

pub struct EmailSender {
    config: EmailConfig,
    client: reqwest::Client,
}

impl EmailSender {
    pub fn new(config: EmailConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }
}

#[async_trait]
impl Sender for EmailSender {
    async fn execute_batch(
        &self,
        items: Vec<(RecipientId, RecipientPayload)>,
    ) -> Result<Vec<DispatchResult>> {
        let items = unwrap_email(items)?;
        match self.config.provider {
            EmailProvider::Mock => Ok(mock_batch(items)),
            EmailProvider::Resend => self.resend_batch(items).await,
            EmailProvider::Ses => self.ses_batch(items).await,
        }
    }
}

fn unwrap_email(
    items: Vec<(RecipientId, RecipientPayload)>,
) -> Result<Vec<(RecipientId, EmailMessage)>> {
    items
        .into_iter()
        .map(|(recipient_id, payload)| match payload {
            RecipientPayload::Email(message) => Ok((recipient_id, message)),
            _ => Err(DispatchError::WrongPayload),
        })
        .collect()
}

fn mock_batch(items: Vec<(RecipientId, EmailMessage)>) -> Vec<DispatchResult> {
    items
        .into_iter()
        .map(|(recipient_id, _)| DispatchResult {
            recipient_id,
            success: true,
            provider_message_id: Some(format!("mock-{}", uuid::Uuid::new_v4())),
            error: None,
        })
        .collect()
}

impl EmailSender {
    async fn resend_batch(&self, items: Vec<(RecipientId, EmailMessage)>) -> Result<Vec<DispatchResult>> {
        #[derive(serde::Serialize)]
        struct ResendPayload<'a> {
            from: &'a str,
            to: &'a str,
            subject: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            html: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            text: Option<&'a str>,
        }
        #[derive(serde::Deserialize)]
        struct ResendResponse {
            id: String,
        }

        let payload: Vec<ResendPayload> = items
            .iter()
            .map(|(_, m)| ResendPayload {
                from: &m.from_email,
                to: &m.to,
                subject: &m.subject,
                html: m.html_content.as_deref(),
                text: m.text_content.as_deref(),
            })
            .collect();

        let response = self
            .client
            .post("https://api.resend.com/emails/batch")
            .bearer_auth(&self.config.api_key_ref)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = format!("resend batch call failed: {}", response.status());
            return Ok(items
                .into_iter()
                .map(|(recipient_id, _)| DispatchResult {
                    recipient_id,
                    success: false,
                    provider_message_id: None,
                    error: Some(error.clone()),
                })
                .collect());
        }

        let parsed: Vec<ResendResponse> = response.json().await.unwrap_or_default();
        Ok(items
            .into_iter()
            .enumerate()
            .map(|(index, (recipient_id, _))| match parsed.get(index) {
                Some(r) => DispatchResult {
                    recipient_id,
                    success: true,
                    provider_message_id: Some(r.id.clone()),
                    error: None,
                },
                None => DispatchResult {
                    recipient_id,
                    success: false,
                    provider_message_id: None,
                    error: Some("missing result in resend batch response".to_owned()),
                },
            })
            .collect())
    }

    async fn ses_batch(&self, items: Vec<(RecipientId, EmailMessage)>) -> Result<Vec<DispatchResult>> {
        // SES has no true multi-recipient batch endpoint; dispatch with
        // bounded parallelism like sms/push (§4.4), capped at a fixed
        // concurrency since SES configs carry no maxParallel field.
        const SES_MAX_PARALLEL: usize = 10;
        crate::parallel::dispatch(&items, SES_MAX_PARALLEL, |(_, m)| {
            let client = self.client.clone();
            let from = self.config.from_email.clone();
            let to = m.to.clone();
            let subject = m.subject.clone();
            let html = m.html_content.clone();
            Box::pin(async move {
                #[derive(serde::Serialize)]
                struct SesRequest {
                    from: String,
                    to: String,
                    subject: String,
                    html: Option<String>,
                }
                let response = client
                    .post("https://email.us-east-1.amazonaws.com/v2/email/outbound-emails")
                    .json(&SesRequest { from, to, subject, html })
                    .send()
                    .await;
                match response {
                    Ok(r) if r.status().is_success() => {
                        (true, Some(format!("ses-{}", uuid::Uuid::new_v4())), None)
                    }
                    Ok(r) => (false, None, Some(format!("ses call failed: {}", r.status()))),
                    Err(err) => (false, None, Some(err.to_string())),
                }
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_owned(),
            from_email: "from@test.com".into(),
            subject: "hi".into(),
            html_content: Some("<b>hi</b>".into()),
            text_content: None,
            variables: Default::default(),
        }
    }

    #[tokio::test]
    async fn mock_provider_never_fails() {
        let sender = EmailSender::new(
            EmailConfig {
                provider: EmailProvider::Mock,
                from_email: "from@test.com".into(),
                api_key_ref: "unused".into(),
            },
            reqwest::Client::new(),
        );
        let id = RecipientId::new();
        let results = sender
            .execute_batch(vec![(id, RecipientPayload::Email(message("a@b.com")))])
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].success);
        assert!(results[0].provider_message_id.as_deref().unwrap().starts_with("mock-"));
    }

    #[tokio::test]
    async fn wrong_payload_type_is_rejected() {
        let sender = EmailSender::new(
            EmailConfig {
                provider: EmailProvider::Mock,
                from_email: "from@test.com".into(),
                api_key_ref: "unused".into(),
            },
            reqwest::Client::new(),
        );
        let id = RecipientId::new();
        let webhook = RecipientPayload::Webhook(model::payload::WebhookMessage {
            recipient_url_or_id: "x".into(),
            body: serde_json::json!({}),
            variables: Default::default(),
        });
        let result = sender.execute_batch(vec![(id, webhook)]).await;
        assert!(matches!(result, Err(DispatchError::WrongPayload)));
    }
}
