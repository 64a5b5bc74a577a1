pub mod maintenance;
pub mod metrics;
pub mod shutdown;
pub mod tracing_setup;

pub use {
    maintenance::Maintaining,
    metrics::{get_storage_registry, serve_metrics, LivenessChecking},
    shutdown::{ShutdownController, ShutdownSignal},
};
