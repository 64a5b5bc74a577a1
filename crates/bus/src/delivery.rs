use {async_trait::async_trait, std::time::Duration};

/// Per-transport ack/nack mechanics, abstracted so the sender/webhook
/// crates depend on [`Delivery`] rather than on `async-nats` directly.
#[async_trait]
pub trait DeliveryHandle: Send + Sync {
    async fn ack(self: Box<Self>) -> crate::error::Result<()>;
    async fn nack(self: Box<Self>, delay: Option<Duration>) -> crate::error::Result<()>;
}

/// One fetched message, awaiting an explicit ack or nack. Dropping a
/// `Delivery` without acking leaves the bus's redelivery timer to do the
/// right thing (§5: graceful shutdown notes unflushed work is picked up by
/// another worker or the next restart).
pub struct Delivery {
    pub payload: Vec<u8>,
    pub redelivery_count: u64,
    handle: Box<dyn DeliveryHandle>,
}

impl Delivery {
    pub fn new(payload: Vec<u8>, redelivery_count: u64, handle: Box<dyn DeliveryHandle>) -> Self {
        Self {
            payload,
            redelivery_count,
            handle,
        }
    }

    pub async fn ack(self) -> crate::error::Result<()> {
        self.handle.ack().await
    }

    pub async fn nack(self, delay: Option<Duration>) -> crate::error::Result<()> {
        self.handle.nack(delay).await
    }
}
