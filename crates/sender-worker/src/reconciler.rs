//! Reconciler (§4.6): syncs hot-state outcomes into R, and recovers batches
//! that stall before reaching a terminal status.
use {
    chrono::Utc,
    database::recipients::SyncUpdate,
    hot_state::HotStore,
    model::BatchId,
    observe::Maintaining,
    sqlx::PgPool,
    std::{sync::Arc, time::Duration},
};

const SYNC_PAGE_SIZE: usize = 500;
const STUCK_SCAN_LIMIT: i64 = 50;

/// Runs on every sender-worker process, not just the leader: the underlying
/// writes are idempotent (`bulk_apply_sync` is a conditional `UPDATE`,
/// `remove_from_pending_sync` is a set removal), so duplicate work across
/// processes costs extra round trips, not correctness.
pub struct SyncReconciler {
    pool: PgPool,
    hot_state: Arc<dyn HotStore>,
}

impl SyncReconciler {
    pub fn new(pool: PgPool, hot_state: Arc<dyn HotStore>) -> Self {
        Self { pool, hot_state }
    }

    async fn sync_one(&self, batch_id: BatchId) -> anyhow::Result<()> {
        let ids = self.hot_state.pending_sync_ids(batch_id, SYNC_PAGE_SIZE).await?;
        if !ids.is_empty() {
            let records = self.hot_state.get_recipient_records(batch_id, &ids).await?;
            let updates: Vec<SyncUpdate> = ids
                .iter()
                .filter_map(|id| {
                    records.get(id).map(|record| SyncUpdate {
                        id: *id,
                        status: record.status,
                        sent_at: record.sent_at,
                        provider_message_id: record.provider_message_id.clone(),
                        error_message: record.error_message.clone(),
                    })
                })
                .collect();

            let mut conn = self.pool.acquire().await?;
            database::recipients::bulk_apply_sync(&mut conn, &updates).await?;
            drop(conn);
            self.hot_state.remove_from_pending_sync(batch_id, &ids).await?;
        }
        self.maybe_finalize(batch_id).await
    }

    async fn maybe_finalize(&self, batch_id: BatchId) -> anyhow::Result<()> {
        let Some(counters) = self.hot_state.get_counters(batch_id).await? else {
            return Ok(());
        };
        let mut conn = self.pool.acquire().await?;
        database::batches::update_counters(&mut conn, batch_id, counters.sent, counters.failed)
            .await?;
        if counters.is_complete() {
            database::batches::mark_completed(&mut conn, batch_id).await?;
            drop(conn);
            self.hot_state.shrink_ttl_after_completion(batch_id).await?;
            tracing::info!(%batch_id, "batch completed");
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Maintaining for SyncReconciler {
    async fn run_maintenance(&self) -> anyhow::Result<()> {
        for batch_id in self.hot_state.active_batches().await? {
            self.sync_one(batch_id).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "sync-reconciler"
    }
}

/// Leader-gated: recovers `processing` batches that have made no progress
/// for longer than `stuck_after`, per §4.6's crash-recovery case.
pub struct StuckBatchRecovery {
    pool: PgPool,
    stuck_after: Duration,
}

impl StuckBatchRecovery {
    pub fn new(pool: PgPool, stuck_after: Duration) -> Self {
        Self { pool, stuck_after }
    }
}

#[async_trait::async_trait]
impl Maintaining for StuckBatchRecovery {
    async fn run_maintenance(&self) -> anyhow::Result<()> {
        let cutoff = Utc::now()
            - chrono::Duration::from_std(self.stuck_after)
                .unwrap_or_else(|_| chrono::Duration::minutes(10));
        let mut conn = self.pool.acquire().await?;
        let stuck = database::batches::select_stuck_processing(&mut conn, cutoff, STUCK_SCAN_LIMIT).await?;
        for batch in stuck {
            if database::recipients::all_terminal(&mut conn, batch.id).await? {
                database::batches::mark_completed(&mut conn, batch.id).await?;
                tracing::info!(batch_id = %batch.id, "stuck batch was actually done, marked completed");
            } else if database::recipients::any_queued(&mut conn, batch.id).await? {
                database::batches::reset_to_queued(&mut conn, batch.id).await?;
                tracing::warn!(batch_id = %batch.id, "stuck batch never reached the sender worker, reset to queued");
            } else {
                tracing::warn!(
                    batch_id = %batch.id,
                    "batch stuck processing with recipients in flight, leaving for the next scan",
                );
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "stuck-batch-recovery"
    }
}
