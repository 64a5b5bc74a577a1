use {
    crate::{
        delivery::{Delivery, DeliveryHandle},
        error::Result,
        trait_def::{Consumer, MessageBus},
    },
    async_nats::jetstream::{
        self,
        consumer::{pull, AckPolicy},
        context::PublishAckFuture,
        stream,
    },
    async_trait::async_trait,
    futures::StreamExt,
    std::time::Duration,
};

/// Durable, at-least-once message bus handle (§2, §6). A cheap `Clone`
/// around the underlying JetStream context, constructed once per process
/// per §9's "process-local singletons are pure connection holders" rule.
#[derive(Clone)]
pub struct Bus {
    context: jetstream::Context,
}

impl Bus {
    pub async fn connect(nats_url: &str) -> Result<Self> {
        let client = async_nats::connect(nats_url).await?;
        let context = jetstream::new(client);
        Ok(Self { context })
    }
}

#[async_trait]
impl MessageBus for Bus {
    /// Ensures a stream exists covering `subjects`, with JetStream's
    /// per-subject publish-dedup window (layer 1 of §4.7's three-layer
    /// dedup strategy, and the chunk/batch idempotency mechanism of §4.2).
    async fn ensure_stream(
        &self,
        name: &str,
        subjects: Vec<String>,
        dedup_window: Duration,
    ) -> Result<()> {
        self.context
            .get_or_create_stream(stream::Config {
                name: name.to_owned(),
                subjects,
                duplicate_window: dedup_window,
                max_age: Duration::from_secs(7 * 24 * 60 * 60),
                ..Default::default()
            })
            .await?;
        Ok(())
    }

    /// Publishes with a deterministic `msgId` so a republish within the
    /// stream's dedup window is a no-op at the broker.
    async fn publish(&self, subject: &str, msg_id: &str, payload: Vec<u8>) -> Result<()> {
        let mut headers = async_nats::HeaderMap::new();
        headers.insert("Nats-Msg-Id", msg_id);
        let ack: PublishAckFuture = self
            .context
            .publish_with_headers(subject.to_owned(), headers, payload.into())
            .await?;
        ack.await?;
        Ok(())
    }

    /// Creates (or reuses) a durable pull consumer bound to `filter_subject`
    /// on stream `stream_name`. One consumer per user for chunk subjects
    /// (§4.3) gives per-user fairness without a separate fairness scheduler.
    async fn durable_consumer(
        &self,
        stream_name: &str,
        durable_name: &str,
        filter_subject: &str,
        ack_wait: Duration,
        max_deliver: i64,
    ) -> Result<Box<dyn Consumer>> {
        let stream = self.context.get_stream(stream_name).await?;
        let consumer = stream
            .get_or_create_consumer(
                durable_name,
                pull::Config {
                    durable_name: Some(durable_name.to_owned()),
                    filter_subject: filter_subject.to_owned(),
                    ack_policy: AckPolicy::Explicit,
                    ack_wait,
                    max_deliver,
                    ..Default::default()
                },
            )
            .await?;
        Ok(Box::new(PullConsumer { consumer }))
    }
}

pub struct PullConsumer {
    consumer: jetstream::consumer::Consumer<pull::Config>,
}

#[async_trait]
impl Consumer for PullConsumer {
    /// Fetches up to `max_messages`, waiting at most `expires` for the
    /// first message (§5: workers fetch in small windows).
    async fn fetch(&self, max_messages: usize, expires: Duration) -> Result<Vec<Delivery>> {
        let mut messages = self
            .consumer
            .fetch()
            .max_messages(max_messages)
            .expires(expires)
            .messages()
            .await?;

        let mut out = Vec::with_capacity(max_messages);
        while let Some(message) = messages.next().await {
            let message = message?;
            let redelivery_count = message
                .info()
                .map(|i| i.delivered as u64)
                .unwrap_or(1)
                .saturating_sub(1);
            let payload = message.payload.to_vec();
            out.push(Delivery::new(
                payload,
                redelivery_count,
                Box::new(NatsDeliveryHandle { message }),
            ));
        }
        Ok(out)
    }
}

struct NatsDeliveryHandle {
    message: jetstream::Message,
}

#[async_trait]
impl DeliveryHandle for NatsDeliveryHandle {
    async fn ack(self: Box<Self>) -> Result<()> {
        self.message.ack().await.map_err(crate::error::Error::from)
    }

    async fn nack(self: Box<Self>, delay: Option<Duration>) -> Result<()> {
        let kind = jetstream::AckKind::Nak(delay);
        self.message
            .ack_with(kind)
            .await
            .map_err(crate::error::Error::from)
    }
}
