//! Per-recipient payload composition (§4.3 step 3): request overrides <
//! batch payload < send-config defaults, layered with the recipient's own
//! `identifier`/`name`/`variables` for substitution.
use {
    crate::{
        batch::{BatchPayload, EmailPayload, PushPayload, SmsPayload, WebhookPayload},
        recipient::Recipient,
        send_config::{EmailConfig, SendConfigPayload},
    },
    serde::Serialize,
    std::collections::HashMap,
};

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub enum PayloadError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("identifier is not a valid email address: {0}")]
    InvalidEmail(String),
}

/// A fully composed, module-specific message ready to hand to a module
/// adapter.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailMessage {
    pub to: String,
    pub from_email: String,
    pub subject: String,
    pub html_content: Option<String>,
    pub text_content: Option<String>,
    pub variables: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    pub recipient_url_or_id: String,
    pub body: serde_json::Value,
    pub variables: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmsMessage {
    pub to: String,
    pub message: String,
    pub variables: HashMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub token: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub variables: HashMap<String, serde_json::Value>,
}

pub fn build_email(
    config: &EmailConfig,
    batch: &EmailPayload,
    recipient: &Recipient,
) -> Result<EmailMessage, PayloadError> {
    if !recipient.identifier.contains('@') {
        return Err(PayloadError::InvalidEmail(recipient.identifier.clone()));
    }
    let from_email = batch
        .from_email
        .clone()
        .unwrap_or_else(|| config.from_email.clone());
    let subject = batch
        .subject
        .clone()
        .ok_or(PayloadError::MissingField("subject"))?;
    if batch.html_content.is_none() && batch.text_content.is_none() {
        return Err(PayloadError::MissingField("htmlContent or textContent"));
    }
    Ok(EmailMessage {
        to: recipient.identifier.clone(),
        from_email,
        subject,
        html_content: batch.html_content.clone(),
        text_content: batch.text_content.clone(),
        variables: recipient.variables.clone(),
    })
}

pub fn build_webhook(batch: &WebhookPayload, recipient: &Recipient) -> WebhookMessage {
    WebhookMessage {
        recipient_url_or_id: recipient.identifier.clone(),
        body: batch.0.clone(),
        variables: recipient.variables.clone(),
    }
}

pub fn build_sms(batch: &SmsPayload, recipient: &Recipient) -> Result<SmsMessage, PayloadError> {
    let message = batch
        .message
        .clone()
        .ok_or(PayloadError::MissingField("message"))?;
    Ok(SmsMessage {
        to: recipient.identifier.clone(),
        message,
        variables: recipient.variables.clone(),
    })
}

pub fn build_push(batch: &PushPayload, recipient: &Recipient) -> Result<PushMessage, PayloadError> {
    if batch.title.is_none() && batch.body.is_none() {
        return Err(PayloadError::MissingField("title or body"));
    }
    Ok(PushMessage {
        token: recipient.identifier.clone(),
        title: batch.title.clone(),
        body: batch.body.clone(),
        variables: recipient.variables.clone(),
    })
}

/// Validates that a [`BatchPayload`]'s module matches the owning
/// [`SendConfigPayload`]'s module, as required when a batch is created.
pub fn validate_payload_module(
    config: &SendConfigPayload,
    payload: &BatchPayload,
) -> Result<(), PayloadError> {
    let matches = matches!(
        (config, payload),
        (SendConfigPayload::Email(_), BatchPayload::Email(_))
            | (SendConfigPayload::Webhook(_), BatchPayload::Webhook(_))
            | (SendConfigPayload::Sms(_), BatchPayload::Sms(_))
            | (SendConfigPayload::Push(_), BatchPayload::Push(_))
    );
    if matches {
        Ok(())
    } else {
        Err(PayloadError::MissingField("payload module mismatch"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ids::{BatchId, RecipientId},
        recipient::RecipientStatus,
        send_config::EmailProvider,
    };

    fn recipient(identifier: &str) -> Recipient {
        Recipient {
            id: RecipientId::new(),
            batch_id: BatchId::new(),
            identifier: identifier.to_owned(),
            name: None,
            variables: HashMap::new(),
            status: RecipientStatus::Pending,
            provider_message_id: None,
            error_message: None,
            sent_at: None,
            delivered_at: None,
            bounced_at: None,
        }
    }

    #[test]
    fn email_requires_at_sign_in_identifier() {
        let config = EmailConfig {
            provider: EmailProvider::Mock,
            from_email: "from@test.com".into(),
            api_key_ref: "k".into(),
        };
        let payload = EmailPayload {
            from_email: None,
            subject: Some("hi".into()),
            html_content: Some("<b>hi</b>".into()),
            text_content: None,
        };
        assert!(build_email(&config, &payload, &recipient("not-an-email")).is_err());
        assert!(build_email(&config, &payload, &recipient("a@test.com")).is_ok());
    }

    #[test]
    fn email_requires_subject_and_body() {
        let config = EmailConfig {
            provider: EmailProvider::Mock,
            from_email: "from@test.com".into(),
            api_key_ref: "k".into(),
        };
        let missing_body = EmailPayload {
            from_email: None,
            subject: Some("hi".into()),
            html_content: None,
            text_content: None,
        };
        assert_eq!(
            build_email(&config, &missing_body, &recipient("a@test.com")),
            Err(PayloadError::MissingField("htmlContent or textContent"))
        );
    }

    #[test]
    fn batch_override_wins_over_config_default() {
        let config = EmailConfig {
            provider: EmailProvider::Mock,
            from_email: "config@test.com".into(),
            api_key_ref: "k".into(),
        };
        let payload = EmailPayload {
            from_email: Some("override@test.com".into()),
            subject: Some("hi".into()),
            html_content: Some("hi".into()),
            text_content: None,
        };
        let msg = build_email(&config, &payload, &recipient("a@test.com")).unwrap();
        assert_eq!(msg.from_email, "override@test.com");
    }
}
