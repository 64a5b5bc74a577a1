use {
    crate::{ids::SendConfigId, ids::UserId, module::Module},
    serde::{Deserialize, Serialize},
};

/// Per-configuration rate limit. `perSecond` is bounded `1..=500` at the API
/// boundary; the core only trusts the value as already validated.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimit {
    pub per_second: u32,
    /// Recipients covered by a single true-batch API call. `None` means
    /// "use the provider default".
    pub recipients_per_request: Option<u32>,
}

/// Polymorphic provider configuration, keyed on [`Module`]. Stored as JSONB
/// at rest; the `module` discriminant is also stored separately on the
/// owning row so it stays immutable and queryable without decoding the JSON.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum SendConfigPayload {
    Email(EmailConfig),
    Webhook(WebhookConfig),
    Sms(SmsConfig),
    Push(PushConfig),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailConfig {
    pub provider: EmailProvider,
    pub from_email: String,
    pub api_key_ref: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Resend,
    Ses,
    Mock,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    pub url: url::Url,
    #[serde(default = "WebhookConfig::default_method")]
    pub method: String,
    #[serde(default = "WebhookConfig::default_timeout_secs")]
    pub timeout_secs: u32,
    #[serde(default)]
    pub retry_count: u32,
    pub webhook_secret: Option<String>,
    #[serde(default = "WebhookConfig::default_signature_header")]
    pub signature_header: String,
}

impl WebhookConfig {
    fn default_method() -> String {
        "POST".to_owned()
    }

    fn default_timeout_secs() -> u32 {
        10
    }

    fn default_signature_header() -> String {
        "x-webhook-signature".to_owned()
    }

    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(ConfigValidationError("timeout_secs must be 1..=60".into()));
        }
        if self.retry_count > 10 {
            return Err(ConfigValidationError("retry_count must be 0..=10".into()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmsConfig {
    pub provider: SmsProvider,
    pub from_number: String,
    pub api_key_ref: String,
    #[serde(default = "SmsConfig::default_max_parallel")]
    pub max_parallel: u32,
}

impl SmsConfig {
    fn default_max_parallel() -> u32 {
        10
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SmsProvider {
    Telnyx,
    Mock,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushConfig {
    pub api_key_ref: String,
    #[serde(default = "PushConfig::default_max_parallel")]
    pub max_parallel: u32,
}

impl PushConfig {
    fn default_max_parallel() -> u32 {
        10
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid send-config: {0}")]
pub struct ConfigValidationError(pub String);

impl SendConfigPayload {
    pub fn module(&self) -> Module {
        match self {
            SendConfigPayload::Email(_) => Module::Email,
            SendConfigPayload::Webhook(_) => Module::Webhook,
            SendConfigPayload::Sms(_) => Module::Sms,
            SendConfigPayload::Push(_) => Module::Push,
        }
    }

    /// Validated at send-config creation time, per spec §4.4.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        match self {
            SendConfigPayload::Email(c) => {
                if c.from_email.is_empty() {
                    return Err(ConfigValidationError("fromEmail is required".into()));
                }
                Ok(())
            }
            SendConfigPayload::Webhook(c) => c.validate(),
            SendConfigPayload::Sms(_) | SendConfigPayload::Push(_) => Ok(()),
        }
    }

    /// Provider-default chunk size (§4.2 step 3), used when `rateLimit` does
    /// not set `recipientsPerRequest`.
    pub fn default_chunk_size(&self) -> usize {
        match self {
            SendConfigPayload::Email(c) => match c.provider {
                EmailProvider::Resend => 100,
                EmailProvider::Ses => 50,
                EmailProvider::Mock => 100,
            },
            SendConfigPayload::Webhook(_) => 100,
            SendConfigPayload::Sms(_) => 1,
            SendConfigPayload::Push(_) => 1,
        }
    }

    pub fn default_rate_per_second(&self) -> u32 {
        match self {
            SendConfigPayload::Email(_) => 14,
            SendConfigPayload::Webhook(_) => 10,
            SendConfigPayload::Sms(_) => 20,
            SendConfigPayload::Push(_) => 20,
        }
    }
}

/// A user's provider credentials + rate-limit policy for one module.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SendConfig {
    pub id: SendConfigId,
    pub user_id: UserId,
    pub name: String,
    pub config: SendConfigPayload,
    pub rate_limit: Option<RateLimit>,
    pub is_default: bool,
    pub is_active: bool,
}

impl SendConfig {
    pub fn module(&self) -> Module {
        self.config.module()
    }

    pub fn chunk_size(&self) -> usize {
        self.rate_limit
            .and_then(|r| r.recipients_per_request)
            .map(|n| n as usize)
            .unwrap_or_else(|| self.config.default_chunk_size())
    }

    pub fn tokens_per_second(&self) -> u32 {
        self.rate_limit
            .map(|r| r.per_second)
            .unwrap_or_else(|| self.config.default_rate_per_second())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_timeout_bounds() {
        let mut cfg = WebhookConfig {
            url: "https://example.com".parse().unwrap(),
            method: "POST".into(),
            timeout_secs: 0,
            retry_count: 0,
            webhook_secret: None,
            signature_header: "x-webhook-signature".into(),
        };
        assert!(cfg.validate().is_err());
        cfg.timeout_secs = 61;
        assert!(cfg.validate().is_err());
        cfg.timeout_secs = 30;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn chunk_size_prefers_override() {
        let cfg = SendConfig {
            id: SendConfigId::new(),
            user_id: UserId::new(),
            name: "default".into(),
            config: SendConfigPayload::Email(EmailConfig {
                provider: EmailProvider::Ses,
                from_email: "a@b.com".into(),
                api_key_ref: "key".into(),
            }),
            rate_limit: Some(RateLimit {
                per_second: 5,
                recipients_per_request: Some(7),
            }),
            is_default: true,
            is_active: true,
        };
        assert_eq!(cfg.chunk_size(), 7);
        assert_eq!(cfg.tokens_per_second(), 5);
    }
}
