use {crate::error::Result, async_trait::async_trait, std::time::Duration};

/// The message-bus interface (§2, §6, §9's "pass interfaces into
/// constructors" rule): durable publish plus a pull-style consumer handle.
/// `Bus`/`PullConsumer` are the NATS JetStream-backed implementation;
/// `testlib` provides an in-memory fake implementing the same traits for
/// tests that don't want a real NATS server.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn ensure_stream(
        &self,
        name: &str,
        subjects: Vec<String>,
        dedup_window: Duration,
    ) -> Result<()>;

    async fn publish(&self, subject: &str, msg_id: &str, payload: Vec<u8>) -> Result<()>;

    async fn durable_consumer(
        &self,
        stream_name: &str,
        durable_name: &str,
        filter_subject: &str,
        ack_wait: Duration,
        max_deliver: i64,
    ) -> Result<Box<dyn Consumer>>;
}

#[async_trait]
pub trait Consumer: Send + Sync {
    async fn fetch(
        &self,
        max_messages: usize,
        expires: Duration,
    ) -> Result<Vec<crate::delivery::Delivery>>;
}
