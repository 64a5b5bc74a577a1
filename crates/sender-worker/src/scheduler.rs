//! Leader-gated batch scheduling (§4.8): moves `scheduled` batches to
//! `queued` once due, then republishes `queued` batches onto the bus.
use {
    bus::{Bus, MessageBus},
    chrono::Utc,
    model::wire::BatchReadyNotification,
    observe::Maintaining,
    sqlx::PgPool,
    std::sync::Arc,
};

const SCHEDULED_BATCH_LIMIT: i64 = 100;
const QUEUED_BATCH_LIMIT: i64 = 100;

pub struct Scheduler {
    pool: PgPool,
}

impl Scheduler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl Maintaining for Scheduler {
    async fn run_maintenance(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.acquire().await?;
        let ready = database::batches::select_scheduled_ready(&mut conn, Utc::now(), SCHEDULED_BATCH_LIMIT).await?;
        for batch in ready {
            database::batches::set_queued(&mut conn, batch.id).await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "scheduler"
    }
}

/// Publishes `sys.batch.process` for batches sitting in `queued`. Dedup is
/// by the deterministic `msgId` the batch processor's stream already
/// enforces, so a batch republished before it flips to `processing` is a
/// broker-side no-op rather than a double-chunk.
pub struct QueuedToBus {
    pool: PgPool,
    bus: Arc<Bus>,
}

impl QueuedToBus {
    pub fn new(pool: PgPool, bus: Arc<Bus>) -> Self {
        Self { pool, bus }
    }
}

#[async_trait::async_trait]
impl Maintaining for QueuedToBus {
    async fn run_maintenance(&self) -> anyhow::Result<()> {
        let mut conn = self.pool.acquire().await?;
        let queued = database::batches::select_queued(&mut conn, QUEUED_BATCH_LIMIT).await?;
        drop(conn);
        for batch in queued {
            let notification = BatchReadyNotification {
                batch_id: batch.id,
                user_id: batch.user_id,
            };
            let payload = serde_json::to_vec(&notification)?;
            self.bus
                .publish(
                    BatchReadyNotification::subject(),
                    &BatchReadyNotification::msg_id(batch.id),
                    payload,
                )
                .await?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "queued-to-bus"
    }
}
