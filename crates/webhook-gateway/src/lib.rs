//! Webhook Gateway (§4.7): intake HTTP server for provider delivery
//! webhooks plus the Event Consumer that enriches and persists them.

pub mod arguments;
pub mod consumer;
pub mod intake;
pub mod providers;
pub mod secrets;
pub mod signature;

use {
    crate::arguments::Arguments,
    anyhow::Context,
    bus::{Bus, MessageBus},
    clap::Parser,
    observe::{LivenessChecking, Maintaining, ShutdownController},
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
    tracing::info!("starting webhook-gateway with arguments:\n{args}");
    run(args).await
}

pub async fn run(args: Arguments) -> anyhow::Result<()> {
    let pool = PgPoolOptions::new()
        .max_connections(args.common.db_max_connections.get())
        .connect(&args.common.db_write_url)
        .await
        .context("connecting to postgres")?;

    let event_store = event_store::EventStore::connect(&args.common.db_write_url, args.common.db_max_connections.get())
        .await
        .context("connecting event store")?;

    let bus = Bus::connect(&args.common.nats_url).await.context("connecting to nats")?;
    bus.ensure_stream(
        bus::topology::WEBHOOK_STREAM,
        vec![bus::topology::WEBHOOK_SUBJECTS.to_owned()],
        bus::topology::DEDUP_WINDOW,
    )
    .await
    .context("ensuring webhook stream")?;

    let pull_consumer = bus
        .durable_consumer(
            bus::topology::WEBHOOK_STREAM,
            &args.consumer_name,
            bus::topology::WEBHOOK_SUBJECTS,
            bus::topology::DEFAULT_ACK_WAIT,
            bus::topology::DEFAULT_MAX_DELIVER,
        )
        .await
        .context("creating durable consumer")?;

    let secrets = Arc::new(secrets::ModuleSecretCache::new(pool.clone()));
    secrets.run_maintenance().await.context("initial webhook-secret cache load")?;
    let secrets_for_refresh = secrets.clone();
    let refresh_interval = args.secret_cache_refresh_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(refresh_interval);
        loop {
            ticker.tick().await;
            if let Err(err) = secrets_for_refresh.run_maintenance().await {
                tracing::error!(?err, "failed to refresh webhook-module secret cache");
            }
        }
    });

    let app_state = Arc::new(intake::AppState {
        bus: Arc::new(bus),
        secrets,
        http_client: reqwest::Client::new(),
        resend_secret: args.resend_webhook_secret,
        telnyx_secret: args.telnyx_webhook_secret,
    });
    let router = intake::router(app_state);

    let event_consumer = consumer::EventConsumer::new(pool, event_store, args.dedup_capacity);
    let mut shutdown = ShutdownController::new_shutdown_on_signal();

    let metrics_server = observe::serve_metrics(Arc::new(Liveness), args.common.metrics_address);
    let consumer_loop =
        event_consumer.run(&*pull_consumer, args.fetch_batch_size, args.flush_interval, &mut shutdown);
    let intake_server = async {
        let listener = tokio::net::TcpListener::bind(args.intake_address).await?;
        axum::serve(listener, router).await
    };

    tokio::select! {
        _ = metrics_server => tracing::error!("metrics server exited"),
        result = intake_server => {
            if let Err(err) = result {
                tracing::error!(?err, "intake http server exited");
            }
        }
        result = consumer_loop => {
            if let Err(err) = result {
                tracing::error!(?err, "event consumer loop exited with error");
            }
        }
    }
    Ok(())
}
