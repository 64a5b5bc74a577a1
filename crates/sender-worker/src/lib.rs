pub mod arguments;
pub mod consumer_manager;
pub mod reconciler;
pub mod scheduler;
pub mod worker;

use {
    crate::{
        arguments::Arguments,
        consumer_manager::ConsumerManager,
        reconciler::{StuckBatchRecovery, SyncReconciler},
        scheduler::{QueuedToBus, Scheduler},
        worker::ChunkWorker,
    },
    anyhow::Context,
    bus::{Bus, MessageBus},
    clap::Parser,
    event_store::EventStore,
    hot_state::{FailurePolicy, HotState},
    leader::LeaderLockTracker,
    observe::{LivenessChecking, Maintaining, ShutdownController},
    rate_limiter::RateLimiter,
    sqlx::postgres::PgPoolOptions,
    std::sync::Arc,
};

struct Liveness;

#[async_trait::async_trait]
impl LivenessChecking for Liveness {
    async fn is_alive(&self) -> bool {
        true
    }
}

pub async fn start(args: impl Iterator<Item = String>) -> anyhow::Result<()> {
    let args = Arguments::parse_from(args);
    observe::tracing_setup::initialize(&args.common.log_filter, args.common.log_format.is_json());
    tracing::info!("starting core-worker with arguments:\n{args}");
    run(args).await
}

pub async fn run(args: Arguments) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(args.common.db_max_connections.get())
        .connect(&args.common.db_write_url)
        .await
        .context("connecting to postgres")?;
    let hot_state: Arc<dyn hot_state::HotStore> = Arc::new(
        HotState::connect(&args.common.redis_url)
            .await
            .context("connecting to redis")?,
    );
    // §6 notes a dedicated store for E in production; this deployment
    // profile shares the write pool's connection string since
    // `CommonArguments` does not carry a second url.
    let event_store = EventStore::connect(&args.common.db_write_url, args.common.db_max_connections.get())
        .await
        .context("connecting event store")?;
    let bus = Arc::new(
        Bus::connect(&args.common.nats_url)
            .await
            .context("connecting to nats")?,
    );
    bus.ensure_stream(
        bus::topology::BATCH_STREAM,
        vec![model::wire::BatchReadyNotification::subject().to_owned()],
        bus::topology::DEDUP_WINDOW,
    )
    .await
    .context("ensuring batch stream")?;
    bus.ensure_stream(
        bus::topology::CHUNK_STREAM,
        vec![bus::topology::CHUNK_SUBJECTS.to_owned()],
        bus::topology::DEDUP_WINDOW,
    )
    .await
    .context("ensuring chunk stream")?;

    let rate_limiter = RateLimiter::new(hot_state.clone(), FailurePolicy::FailOpen);
    let http_client = reqwest::Client::new();
    let worker = Arc::new(ChunkWorker::new(
        pool.clone(),
        hot_state.clone(),
        event_store,
        rate_limiter,
        http_client,
    ));
    let consumer_manager = ConsumerManager::new(bus.clone(), worker, args.fetch_batch_size);
    consumer_manager
        .discover(&pool)
        .await
        .context("discovering active users at startup")?;

    let sync_reconciler = SyncReconciler::new(pool.clone(), hot_state.clone());
    let stuck_recovery = StuckBatchRecovery::new(pool.clone(), args.stuck_after);
    let scheduler = Scheduler::new(pool.clone());
    let queued_to_bus = QueuedToBus::new(pool.clone(), bus.clone());
    let mut leader = LeaderLockTracker::enabled(hot_state.clone(), args.worker_id.clone(), args.leader_lock_ttl);

    tokio::spawn(observe::serve_metrics(Arc::new(Liveness), args.common.metrics_address));

    let mut shutdown = ShutdownController::new_shutdown_on_signal();
    let mut leader_tick = tokio::time::interval(args.leader_lock_ttl / 2);
    let mut sync_tick = tokio::time::interval(args.sync_interval);
    let mut discovery_tick = tokio::time::interval(args.consumer_discovery_interval);
    let mut scheduler_tick = tokio::time::interval(args.scheduler_interval);
    let mut queued_tick = tokio::time::interval(args.queued_to_bus_interval);
    let mut stuck_tick = tokio::time::interval(args.stuck_scan_interval);

    loop {
        if shutdown.should_shutdown() {
            tracing::info!("core-worker shutting down");
            consumer_manager.request_stop();
            leader.release().await;
            return Ok(());
        }

        tokio::select! {
            _ = leader_tick.tick() => {
                leader.try_acquire().await;
                if leader.just_stepped_up() {
                    tracing::info!(worker_id = %args.worker_id, "became leader");
                }
            }
            _ = sync_tick.tick() => {
                run_tick(&sync_reconciler).await;
            }
            _ = discovery_tick.tick() => {
                if let Err(err) = consumer_manager.discover(&pool).await {
                    tracing::error!(?err, "consumer discovery tick failed");
                }
            }
            _ = scheduler_tick.tick() => {
                if leader.is_leader() {
                    run_tick(&scheduler).await;
                }
            }
            _ = queued_tick.tick() => {
                if leader.is_leader() {
                    run_tick(&queued_to_bus).await;
                }
            }
            _ = stuck_tick.tick() => {
                if leader.is_leader() {
                    run_tick(&stuck_recovery).await;
                }
            }
        }
    }
}

async fn run_tick(component: &dyn Maintaining) {
    if let Err(err) = component.run_maintenance().await {
        tracing::error!(?err, component = component.name(), "maintenance tick failed");
    }
}
