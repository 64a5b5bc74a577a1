#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("hot-state circuit breaker is open")]
    CircuitOpen,
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
