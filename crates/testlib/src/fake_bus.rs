//! In-memory [`MessageBus`]/[`Consumer`] fake. Matches subjects with the
//! same single-token `*` wildcard NATS uses, and mirrors the dedup-window
//! bus's broker-side `msgId` semantics so tests exercise layer-1 dedup
//! without a running NATS server.
use {
    async_trait::async_trait,
    bus::{Consumer, Delivery, DeliveryHandle, MessageBus},
    std::{
        collections::HashSet,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::sync::Notify,
};

struct Message {
    subject: String,
    payload: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    published_ids: HashSet<String>,
    queue: Vec<Message>,
}

/// Shared state behind `Arc`s internally, so `durable_consumer(&self, ...)`
/// can hand out a [`FakeConsumer`] that outlives the borrow without wrapping
/// the whole bus in an `Arc` at the call site.
#[derive(Clone)]
pub struct FakeBus {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
}

impl FakeBus {
    pub fn new() -> Self {
        Self { inner: Arc::new(Mutex::new(Inner::default())), notify: Arc::new(Notify::new()) }
    }

    pub fn published_count(&self) -> usize {
        self.inner.lock().unwrap().published_ids.len()
    }
}

impl Default for FakeBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBus for FakeBus {
    async fn ensure_stream(
        &self,
        _name: &str,
        _subjects: Vec<String>,
        _dedup_window: Duration,
    ) -> bus::error::Result<()> {
        Ok(())
    }

    async fn publish(&self, subject: &str, msg_id: &str, payload: Vec<u8>) -> bus::error::Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.published_ids.insert(msg_id.to_owned()) {
            return Ok(());
        }
        inner.queue.push(Message { subject: subject.to_owned(), payload });
        drop(inner);
        self.notify.notify_waiters();
        Ok(())
    }

    async fn durable_consumer(
        &self,
        _stream_name: &str,
        _durable_name: &str,
        filter_subject: &str,
        _ack_wait: Duration,
        _max_deliver: i64,
    ) -> bus::error::Result<Box<dyn Consumer>> {
        Ok(Box::new(FakeConsumer {
            inner: self.inner.clone(),
            notify: self.notify.clone(),
            filter: filter_subject.to_owned(),
        }))
    }
}

pub struct FakeConsumer {
    inner: Arc<Mutex<Inner>>,
    notify: Arc<Notify>,
    filter: String,
}

#[async_trait]
impl Consumer for FakeConsumer {
    async fn fetch(&self, max_messages: usize, expires: Duration) -> bus::error::Result<Vec<Delivery>> {
        let deadline = tokio::time::Instant::now() + expires;
        loop {
            {
                let mut inner = self.inner.lock().unwrap();
                let mut out = Vec::new();
                let mut remaining = Vec::new();
                for message in inner.queue.drain(..) {
                    if out.len() < max_messages && subject_matches(&self.filter, &message.subject) {
                        out.push(message);
                    } else {
                        remaining.push(message);
                    }
                }
                inner.queue = remaining;
                if !out.is_empty() {
                    return Ok(out
                        .into_iter()
                        .map(|m| Delivery::new(m.payload, 0, Box::new(NoopHandle) as Box<dyn DeliveryHandle>))
                        .collect());
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::select! {
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep_until(deadline) => return Ok(Vec::new()),
            }
        }
    }
}

struct NoopHandle;

#[async_trait]
impl DeliveryHandle for NoopHandle {
    async fn ack(self: Box<Self>) -> bus::error::Result<()> {
        Ok(())
    }

    async fn nack(self: Box<Self>, _delay: Option<Duration>) -> bus::error::Result<()> {
        Ok(())
    }
}

/// Single-token `*` wildcard matching, e.g. `webhook.*.*` matches
/// `webhook.resend.delivered`. `>` matches the remainder of the subject.
fn subject_matches(filter: &str, subject: &str) -> bool {
    let filter_tokens: Vec<&str> = filter.split('.').collect();
    let subject_tokens: Vec<&str> = subject.split('.').collect();

    for (i, token) in filter_tokens.iter().enumerate() {
        if *token == ">" {
            return true;
        }
        match subject_tokens.get(i) {
            Some(actual) if *token == "*" || token == actual => continue,
            _ => return false,
        }
    }
    filter_tokens.len() == subject_tokens.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_matches_single_token() {
        assert!(subject_matches("webhook.*.*", "webhook.resend.delivered"));
        assert!(!subject_matches("webhook.*.*", "webhook.resend"));
        assert!(subject_matches("user.*.chunk", "user.abc.chunk"));
    }

    #[tokio::test]
    async fn duplicate_msg_id_is_published_once() {
        let bus = FakeBus::new();
        bus.publish("webhook.resend.delivered", "id-1", b"a".to_vec()).await.unwrap();
        bus.publish("webhook.resend.delivered", "id-1", b"b".to_vec()).await.unwrap();
        assert_eq!(bus.published_count(), 1);
    }

    #[tokio::test]
    async fn fetch_respects_subject_filter() {
        let bus = FakeBus::new();
        bus.publish("webhook.resend.delivered", "id-1", b"payload".to_vec()).await.unwrap();
        bus.publish("user.abc.chunk", "id-2", b"other".to_vec()).await.unwrap();
        let consumer = bus
            .durable_consumer("s", "d", "webhook.*.*", Duration::from_secs(1), 1)
            .await
            .unwrap();
        let deliveries = consumer.fetch(10, Duration::from_millis(50)).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].payload, b"payload");
    }
}
