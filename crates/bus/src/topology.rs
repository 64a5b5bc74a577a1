//! Stream/consumer naming shared by every bus producer and consumer (§6).
//! Centralized here so the batch processor (publisher of chunks) and the
//! sender worker (consumer of chunks) can never drift on a stream name.

use std::time::Duration;

pub const BATCH_STREAM: &str = "sendcore-batches";
pub const BATCH_CONSUMER: &str = "batch-processor";

pub const CHUNK_STREAM: &str = "sendcore-chunks";
pub const CHUNK_SUBJECTS: &str = "user.*.chunk";

pub const WEBHOOK_STREAM: &str = "sendcore-webhook-events";
pub const WEBHOOK_SUBJECTS: &str = "webhook.*.*";
pub const WEBHOOK_EVENT_CONSUMER: &str = "webhook-event-consumer";

/// NATS JetStream's publish-time deduplication window (§4.2 step 6, §4.7
/// layer 1): a republish of the same `msgId` inside this window is a no-op
/// at the broker.
pub const DEDUP_WINDOW: Duration = Duration::from_secs(2 * 60);

pub const DEFAULT_ACK_WAIT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_DELIVER: i64 = 10;

pub fn chunk_consumer_name(user_id: impl std::fmt::Display) -> String {
    format!("chunk-{user_id}")
}
