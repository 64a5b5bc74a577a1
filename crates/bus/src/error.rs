#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("nats connect error: {0}")]
    Connect(#[from] async_nats::ConnectError),
    #[error("nats publish error: {0}")]
    Publish(#[from] async_nats::jetstream::context::PublishError),
    #[error("jetstream context error: {0}")]
    Context(#[from] async_nats::jetstream::context::CreateStreamError),
    #[error("jetstream get stream error: {0}")]
    GetStream(#[from] async_nats::jetstream::context::GetStreamError),
    #[error("jetstream consumer error: {0}")]
    Consumer(#[from] async_nats::jetstream::stream::ConsumerError),
    #[error("jetstream fetch error: {0}")]
    Fetch(#[from] async_nats::jetstream::consumer::pull::MessagesError),
    #[error("jetstream batch error: {0}")]
    Batch(#[from] async_nats::jetstream::consumer::pull::BatchError),
    #[error("jetstream ack error: {0}")]
    Ack(#[from] async_nats::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
