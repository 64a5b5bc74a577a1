//! Process-wide Prometheus registry and `/metrics` `/health` endpoints.
//!
//! Grounded in the teacher's `global_metrics::get_metric_storage_registry()`
//! usage (`crates/autopilot/src/lib.rs`, `crates/autopilot/src/
//! leader_lock_tracker.rs`): a single lazily-built registry shared by every
//! `prometheus_metric_storage::MetricStorage` struct in the process.

use {
    async_trait::async_trait,
    axum::{extract::State, routing::get, Router},
    prometheus_metric_storage::StorageRegistry,
    std::{net::SocketAddr, sync::Arc, sync::OnceLock},
};

static REGISTRY: OnceLock<StorageRegistry> = OnceLock::new();

/// Returns the process-wide metric storage registry, creating it on first
/// use. There is exactly one of these per process (§9: hot-state/bus/db are
/// pure connection holders constructed once; this is the metrics analogue).
pub fn get_storage_registry() -> &'static StorageRegistry {
    REGISTRY.get_or_init(|| StorageRegistry::new(prometheus::Registry::new()))
}

/// Liveness contract a binary implements to back `/health`.
///
/// Mirrors the teacher's `shared::metrics::LivenessChecking` trait
/// (`crates/autopilot/src/lib.rs`'s `Liveness` implementor).
#[async_trait]
pub trait LivenessChecking: Send + Sync {
    async fn is_alive(&self) -> bool;
}

struct AppState {
    liveness: Arc<dyn LivenessChecking>,
}

async fn metrics_handler() -> String {
    use prometheus::{Encoder, TextEncoder};
    let metric_families = get_storage_registry().gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&metric_families, &mut buffer)
        .expect("prometheus text encoding is infallible for well-formed metrics");
    String::from_utf8(buffer).expect("prometheus text encoding is valid utf8")
}

async fn health_handler(State(state): State<Arc<AppState>>) -> &'static str {
    if state.liveness.is_alive().await {
        "OK"
    } else {
        "NOT OK"
    }
}

/// Serves `/metrics`, `/health`, `/health/detailed` until the process exits.
/// Never expected to return in normal operation; callers `tokio::select!`
/// this against a shutdown signal, matching the teacher's
/// `shared::metrics::serve_metrics` usage in `crates/autopilot/src/lib.rs`.
pub async fn serve_metrics(liveness: Arc<dyn LivenessChecking>, address: SocketAddr) {
    let state = Arc::new(AppState { liveness });
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/health/detailed", get(health_handler))
        .with_state(state);

    match tokio::net::TcpListener::bind(address).await {
        Ok(listener) => {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!(%err, "metrics server exited");
            }
        }
        Err(err) => {
            tracing::error!(%err, %address, "failed to bind metrics server");
        }
    }
}
