#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("payload composition failed: {0}")]
    Payload(#[from] model::payload::PayloadError),
    #[error("provider request failed: {0}")]
    Provider(#[from] reqwest::Error),
    #[error("webhook config missing for this send-config")]
    Misconfigured,
    #[error("sender received a payload for the wrong module")]
    WrongPayload,
}

pub type Result<T> = std::result::Result<T, DispatchError>;
