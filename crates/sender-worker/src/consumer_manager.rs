//! One durable chunk consumer per user (§4.3), spawned lazily.
//!
//! Discovery is by periodic database scan (`select_active_user_ids`) rather
//! than a wildcard subscription on `user.*.chunk` — JetStream pull consumers
//! are bound to a single filter subject, so there is no cheap way to learn
//! "a new subject just got its first message" without either a wildcard
//! push consumer (which would fight the per-user fairness this design
//! wants) or this scan. A newly-active user waits at most one scan interval
//! for its consumer to come up.
use {
    crate::worker::ChunkWorker,
    bus::{Bus, Consumer},
    dashmap::DashMap,
    model::{wire::ChunkMessage, UserId},
    sqlx::PgPool,
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    },
    tokio::task::JoinHandle,
};

pub struct ConsumerManager {
    bus: Arc<Bus>,
    worker: Arc<ChunkWorker>,
    fetch_batch_size: usize,
    tasks: DashMap<UserId, JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl ConsumerManager {
    pub fn new(bus: Arc<Bus>, worker: Arc<ChunkWorker>, fetch_batch_size: usize) -> Self {
        Self {
            bus,
            worker,
            fetch_batch_size,
            tasks: DashMap::new(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Discovers users with a `processing` batch and ensures each has a
    /// running consumer task. Called at startup and on every re-scan tick.
    pub async fn discover(&self, pool: &PgPool) -> anyhow::Result<()> {
        let mut conn = pool.acquire().await?;
        let user_ids = database::batches::select_active_user_ids(&mut conn).await?;
        drop(conn);
        for user_id in user_ids {
            self.ensure_consumer(user_id).await?;
        }
        Ok(())
    }

    /// Spawns a fetch loop for `user_id` unless one is already running.
    /// Tasks are never torn down once spawned, even after the user's batches
    /// finish — the next chunk for that user (if any) reuses it. This
    /// trades a long-lived idle pull-consumer task per ever-seen user for
    /// not having to plumb reference counting through the dashmap.
    pub async fn ensure_consumer(&self, user_id: UserId) -> anyhow::Result<()> {
        if self.tasks.contains_key(&user_id) {
            return Ok(());
        }
        let durable_name = bus::topology::chunk_consumer_name(user_id);
        let subject = ChunkMessage::subject(user_id);
        let consumer = self
            .bus
            .durable_consumer(
                bus::topology::CHUNK_STREAM,
                &durable_name,
                &subject,
                bus::topology::DEFAULT_ACK_WAIT,
                bus::topology::DEFAULT_MAX_DELIVER,
            )
            .await?;

        let worker = self.worker.clone();
        let fetch_batch_size = self.fetch_batch_size;
        let stop = self.stop.clone();
        let handle = tokio::spawn(async move {
            run_consumer_loop(consumer, worker, fetch_batch_size, stop, user_id).await;
        });
        self.tasks.insert(user_id, handle);
        tracing::info!(%user_id, "spawned chunk consumer");
        Ok(())
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

async fn run_consumer_loop(
    consumer: Box<dyn Consumer>,
    worker: Arc<ChunkWorker>,
    fetch_batch_size: usize,
    stop: Arc<AtomicBool>,
    user_id: UserId,
) {
    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::info!(%user_id, "chunk consumer stopping");
            return;
        }

        let deliveries = match consumer.fetch(fetch_batch_size, Duration::from_secs(5)).await {
            Ok(deliveries) => deliveries,
            Err(err) => {
                tracing::error!(?err, %user_id, "chunk fetch failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        for delivery in deliveries {
            let message: ChunkMessage = match serde_json::from_slice(&delivery.payload) {
                Ok(message) => message,
                Err(err) => {
                    tracing::error!(?err, "dropping unparseable chunk message");
                    if let Err(err) = delivery.ack().await {
                        tracing::error!(?err, "failed to ack unparseable chunk message");
                    }
                    continue;
                }
            };

            let outcome = worker.process_chunk(&message).await;
            match outcome {
                Ok(()) => {
                    if let Err(err) = delivery.ack().await {
                        tracing::error!(?err, batch_id = %message.batch_id, "failed to ack chunk");
                    }
                }
                Err(err) => {
                    tracing::error!(
                        ?err,
                        batch_id = %message.batch_id,
                        chunk_index = message.chunk_index,
                        "chunk processing failed, nacking",
                    );
                    if let Err(err) = delivery.nack(Some(Duration::from_secs(2))).await {
                        tracing::error!(?err, batch_id = %message.batch_id, "failed to nack chunk");
                    }
                }
            }
        }
    }
}
