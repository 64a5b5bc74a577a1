use {
    bus::{Bus, Consumer},
    hot_state::HotStore,
    model::{
        wire::{BatchReadyNotification, ChunkMessage},
        RecipientId,
    },
    observe::ShutdownController,
    sqlx::PgPool,
    std::{sync::Arc, time::Duration},
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "batch_processor")]
struct Metrics {
    /// Batches processed, labeled by terminal outcome.
    #[metric(labels("outcome"))]
    batches_processed: prometheus::IntCounterVec,
    /// Chunks published across all processed batches.
    chunks_published: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Self::instance(observe::metrics::get_storage_registry()).expect("metric registration")
    }
}

pub struct Processor {
    pool: PgPool,
    hot_state: Arc<dyn HotStore>,
    bus: Arc<Bus>,
}

impl Processor {
    pub fn new(pool: PgPool, hot_state: Arc<dyn HotStore>, bus: Arc<Bus>) -> Self {
        Self { pool, hot_state, bus }
    }

    pub async fn run(
        &self,
        consumer: &dyn Consumer,
        fetch_batch_size: usize,
        shutdown: &mut ShutdownController,
    ) -> anyhow::Result<()> {
        loop {
            if shutdown.should_shutdown() {
                tracing::info!("batch processor shutting down");
                return Ok(());
            }

            let deliveries = consumer.fetch(fetch_batch_size, Duration::from_secs(5)).await?;
            for delivery in deliveries {
                let notification: BatchReadyNotification = match serde_json::from_slice(&delivery.payload)
                {
                    Ok(n) => n,
                    Err(err) => {
                        tracing::error!(?err, "dropping unparseable batch notification");
                        delivery.ack().await?;
                        continue;
                    }
                };

                match self.process_one(&notification).await {
                    Ok(chunk_count) => {
                        Metrics::get().batches_processed.with_label_values(&["ok"]).inc();
                        Metrics::get().chunks_published.inc_by(chunk_count as u64);
                        delivery.ack().await?;
                    }
                    Err(err) => {
                        tracing::error!(?err, batch_id = %notification.batch_id, "failed to process batch, nacking");
                        Metrics::get().batches_processed.with_label_values(&["error"]).inc();
                        delivery.nack(Some(Duration::from_secs(1))).await?;
                    }
                }
            }
        }
    }

    /// Returns the number of chunks published. Steps follow §4.2 exactly.
    async fn process_one(&self, notification: &BatchReadyNotification) -> anyhow::Result<usize> {
        let mut tx = self.pool.begin().await?;

        let batch = database::batches::fetch_by_id(&mut tx, notification.batch_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("batch {} not found", notification.batch_id))?;

        let send_config_id = batch
            .send_config_id
            .ok_or_else(|| anyhow::anyhow!("batch {} has no send-config", batch.id))?;
        let send_config = database::send_configs::fetch_by_id(&mut tx, send_config_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("send-config {send_config_id} not found"))?;

        let pending_ids = database::recipients::select_pending_ids(&mut tx, batch.id).await?;
        if pending_ids.is_empty() {
            tracing::info!(batch_id = %batch.id, "no pending recipients, nothing to chunk");
            return Ok(0);
        }

        let chunk_size = send_config.chunk_size().max(1);

        // Step 4: idempotent claim + counters + global pending, all
        // "set-if-unset"/additive so a redelivered notification is a no-op.
        database::batches::mark_processing(&mut tx, batch.id).await?;
        self.hot_state
            .init_counters(batch.id, pending_ids.len() as i64)
            .await?;
        self.hot_state.add_global_pending(pending_ids.len() as i64).await?;

        tx.commit().await?;

        let chunks = split_into_chunks(&pending_ids, chunk_size);
        for (chunk_index, recipient_ids) in chunks.iter().enumerate() {
            let message = ChunkMessage {
                batch_id: batch.id,
                user_id: batch.user_id,
                chunk_index: chunk_index as u32,
                recipient_ids: recipient_ids.clone(),
                send_config: send_config.clone(),
                batch_payload: batch.payload.clone(),
                dry_run: batch.dry_run,
            };
            let payload = serde_json::to_vec(&message)?;
            let msg_id = ChunkMessage::msg_id(batch.id, chunk_index as u32);
            self.bus
                .publish(&ChunkMessage::subject(batch.user_id), &msg_id, payload)
                .await?;
        }

        tracing::info!(
            batch_id = %batch.id,
            recipients = pending_ids.len(),
            chunks = chunks.len(),
            "published chunks for batch"
        );
        Ok(chunks.len())
    }
}

fn split_into_chunks(ids: &[RecipientId], chunk_size: usize) -> Vec<Vec<RecipientId>> {
    ids.chunks(chunk_size).map(|c| c.to_vec()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_is_stable_and_covers_every_id() {
        let ids: Vec<RecipientId> = (0..7).map(|_| RecipientId::new()).collect();
        let chunks = split_into_chunks(&ids, 3);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 3);
        assert_eq!(chunks[2].len(), 1);
        let flattened: Vec<RecipientId> = chunks.into_iter().flatten().collect();
        assert_eq!(flattened, ids);
    }
}
