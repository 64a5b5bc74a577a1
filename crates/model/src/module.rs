use serde::{Deserialize, Serialize};

/// A delivery channel. Immutable on a [`crate::send_config::SendConfig`]
/// once created.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Module {
    Email,
    Webhook,
    Sms,
    Push,
}

impl Module {
    pub fn as_str(&self) -> &'static str {
        match self {
            Module::Email => "email",
            Module::Webhook => "webhook",
            Module::Sms => "sms",
            Module::Push => "push",
        }
    }
}

impl std::fmt::Display for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Module {
    type Err = UnknownModule;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(Module::Email),
            "webhook" => Ok(Module::Webhook),
            "sms" => Ok(Module::Sms),
            "push" => Ok(Module::Push),
            other => Err(UnknownModule(other.to_owned())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown module: {0}")]
pub struct UnknownModule(pub String);
