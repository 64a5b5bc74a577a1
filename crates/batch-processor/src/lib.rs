//! Batch Processor (§4.2): consumes `sys.batch.process`, splits a queued
//! batch's pending recipients into chunks, and fans them out onto
//! per-user chunk subjects.

pub mod arguments;
pub mod processor;

use {
    crate::arguments::Arguments,
    anyhow::Context,
    bus::{Bus, MessageBus},
    clap::Parser,
    hot_state::HotState,
    observe::{LivenessChecking, ShutdownController},
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
    tracing::info!("starting batch-processor with arguments:\n{args}");
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
    let bus = Bus::connect(&args.common.nats_url)
        .await
        .context("connecting to nats")?;
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

    let consumer = bus
        .durable_consumer(
            bus::topology::BATCH_STREAM,
            &args.consumer_name,
            model::wire::BatchReadyNotification::subject(),
            bus::topology::DEFAULT_ACK_WAIT,
            bus::topology::DEFAULT_MAX_DELIVER,
        )
        .await
        .context("creating durable consumer")?;

    let processor = processor::Processor::new(pool, hot_state, Arc::new(bus));
    let mut shutdown = ShutdownController::new_shutdown_on_signal();

    let metrics_server = observe::serve_metrics(Arc::new(Liveness), args.common.metrics_address);
    let process_loop = processor.run(&*consumer, args.fetch_batch_size, &mut shutdown);

    tokio::select! {
        _ = metrics_server => tracing::error!("metrics server exited"),
        result = process_loop => {
            if let Err(err) = result {
                tracing::error!(?err, "processing loop exited with error");
            }
        }
    }
    Ok(())
}
