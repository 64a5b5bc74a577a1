//! Event Consumer (§4.7 step 2-4): consumes `webhook.*.*`, enriches each
//! event against the lookup index, buffers, and flushes bulk status effects
//! plus the append-only event log together.
use {
    bus::Consumer,
    chrono::Utc,
    event_store::{EnrichedEvent, EventStore},
    model::{BatchId, WebhookEvent},
    observe::ShutdownController,
    sqlx::PgPool,
    std::{collections::HashMap, sync::Mutex, time::Duration},
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "webhook_event_consumer")]
struct Metrics {
    /// Events processed, labeled by outcome.
    #[metric(labels("outcome"))]
    events_processed: prometheus::IntCounterVec,
    /// Events dropped by the in-process dedup cache before touching R or E.
    events_deduped: prometheus::IntCounter,
    /// Events that had no lookup-index match and were acked without buffering.
    events_unmatched: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Self::instance(observe::metrics::get_storage_registry()).expect("metric registration")
    }
}

pub struct EventConsumer {
    pool: PgPool,
    event_store: EventStore,
    dedup: Mutex<lru::LruCache<String, ()>>,
}

impl EventConsumer {
    pub fn new(pool: PgPool, event_store: EventStore, dedup_capacity: usize) -> Self {
        let capacity = std::num::NonZeroUsize::new(dedup_capacity.max(1)).expect("capacity is non-zero");
        Self { pool, event_store, dedup: Mutex::new(lru::LruCache::new(capacity)) }
    }

    pub async fn run(
        &self,
        consumer: &dyn Consumer,
        fetch_batch_size: usize,
        flush_interval: Duration,
        shutdown: &mut ShutdownController,
    ) -> anyhow::Result<()> {
        let mut events: Vec<EnrichedEvent> = Vec::with_capacity(fetch_batch_size);
        let mut deliveries: Vec<bus::Delivery> = Vec::with_capacity(fetch_batch_size);
        let mut ticker = tokio::time::interval(flush_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            if shutdown.should_shutdown() {
                if !events.is_empty() {
                    self.flush(std::mem::take(&mut events), std::mem::take(&mut deliveries)).await?;
                }
                tracing::info!("webhook event consumer shutting down");
                return Ok(());
            }

            tokio::select! {
                deliveries_fetched = consumer.fetch(fetch_batch_size, Duration::from_secs(1)) => {
                    for delivery in deliveries_fetched? {
                        match self.intake(&delivery.payload).await {
                            Ok(Some(enriched)) => {
                                events.push(enriched);
                                deliveries.push(delivery);
                            }
                            Ok(None) => {
                                // deduped, or no lookup-index match: nothing to buffer.
                                delivery.ack().await?;
                            }
                            Err(err) => {
                                tracing::error!(?err, "failed to enrich webhook event, nacking");
                                Metrics::get().events_processed.with_label_values(&["error"]).inc();
                                delivery.nack(Some(Duration::from_secs(1))).await?;
                            }
                        }
                    }
                    if events.len() >= fetch_batch_size {
                        self.flush(std::mem::take(&mut events), std::mem::take(&mut deliveries)).await?;
                    }
                }
                _ = ticker.tick() => {
                    if !events.is_empty() {
                        self.flush(std::mem::take(&mut events), std::mem::take(&mut deliveries)).await?;
                    }
                }
            }
        }
    }

    /// Parses, checks dedup layer 2, and enriches via the lookup index.
    /// Returns `None` for events that should just be acked with no further
    /// work (duplicate, or a `providerMessageId` this process has never
    /// seen — most likely an event for a batch R doesn't have yet).
    async fn intake(&self, payload: &[u8]) -> anyhow::Result<Option<EnrichedEvent>> {
        let event: WebhookEvent = serde_json::from_slice(payload)?;

        if self.seen_recently(&event.id) {
            Metrics::get().events_deduped.inc();
            return Ok(None);
        }

        let Some((recipient_id, batch_id, user_id)) =
            self.event_store.lookup(&event.provider_message_id).await?
        else {
            tracing::warn!(provider_message_id = %event.provider_message_id, "no lookup-index match for webhook event");
            Metrics::get().events_unmatched.inc();
            return Ok(None);
        };

        Ok(Some(EnrichedEvent { event, recipient_id, batch_id, user_id }))
    }

    fn seen_recently(&self, event_id: &str) -> bool {
        let mut dedup = self.dedup.lock().expect("dedup lock is never poisoned");
        if dedup.contains(event_id) {
            return true;
        }
        dedup.put(event_id.to_owned(), ());
        false
    }

    /// Applies bulk status effects, appends to E, then acks — in that order,
    /// so a DB failure leaves the deliveries unacked and the bus redelivers
    /// the whole batch (§4.7: "mark layer 2 only after ack so a failure
    /// requeues").
    async fn flush(&self, events: Vec<EnrichedEvent>, deliveries: Vec<bus::Delivery>) -> anyhow::Result<()> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;
        if let Err(err) = apply_status_effects(&mut tx, &events).await {
            tracing::error!(?err, "failed to apply status effects, nacking batch");
            tx.rollback().await.ok();
            for delivery in deliveries {
                delivery.nack(Some(Duration::from_secs(1))).await?;
            }
            return Ok(());
        }
        tx.commit().await?;

        if let Err(err) = self.event_store.append_events(&events).await {
            tracing::error!(?err, "failed to append events to event store, nacking batch");
            for delivery in deliveries {
                delivery.nack(Some(Duration::from_secs(1))).await?;
            }
            return Ok(());
        }

        for delivery in deliveries {
            delivery.ack().await?;
        }
        Metrics::get().events_processed.with_label_values(&["ok"]).inc_by(events.len() as u64);
        Ok(())
    }
}

/// Groups by effect (spec §4.7 step 4: "deliveries -> UPDATE ... bounces/
/// complaints analogous; opens/clicks only append to E") and tallies each
/// `bulk_mark_*`'s returned batch ids to drive the counter increments.
async fn apply_status_effects(
    tx: &mut sqlx::PgConnection,
    events: &[EnrichedEvent],
) -> anyhow::Result<()> {
    let mut delivered = Vec::new();
    let mut bounced = Vec::new();
    let mut complained = Vec::new();

    for enriched in events {
        match enriched.event.event_type {
            model::EventType::Delivered => delivered.push(enriched.event.provider_message_id.clone()),
            model::EventType::Bounced | model::EventType::SoftBounced => {
                bounced.push(enriched.event.provider_message_id.clone())
            }
            model::EventType::Complained => complained.push(enriched.event.provider_message_id.clone()),
            model::EventType::Opened
            | model::EventType::Clicked
            | model::EventType::Sent
            | model::EventType::Failed
            | model::EventType::CustomEvent => {}
        }
    }

    let delivered_batches =
        database::recipients::bulk_mark_delivered(tx, &delivered, Utc::now()).await?;
    for (batch_id, count) in tally(delivered_batches) {
        database::batches::increment_delivered(tx, batch_id, count).await?;
    }

    let bounced_batches = database::recipients::bulk_mark_bounced(tx, &bounced).await?;
    for (batch_id, count) in tally(bounced_batches) {
        database::batches::increment_bounced(tx, batch_id, count).await?;
    }

    // Complaints only mutate recipient status; batches carries no
    // complained_count counter to increment.
    database::recipients::bulk_mark_complained(tx, &complained).await?;

    Ok(())
}

fn tally(batch_ids: Vec<BatchId>) -> HashMap<BatchId, i64> {
    let mut counts = HashMap::new();
    for id in batch_ids {
        *counts.entry(id).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_counts_repeated_batch_ids() {
        let a = BatchId::new();
        let b = BatchId::new();
        let counts = tally(vec![a, a, b]);
        assert_eq!(counts[&a], 2);
        assert_eq!(counts[&b], 1);
    }

    #[test]
    fn dedup_cache_flags_repeats() {
        let capacity = std::num::NonZeroUsize::new(16).unwrap();
        let dedup = Mutex::new(lru::LruCache::<String, ()>::new(capacity));

        let mut cache = dedup.lock().unwrap();
        assert!(!cache.contains("a"));
        cache.put("a".to_owned(), ());
        assert!(cache.contains("a"));
    }
}
