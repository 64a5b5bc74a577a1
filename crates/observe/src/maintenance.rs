//! Generalized from the teacher's `crates/autopilot/src/maintenance.rs` /
//! `event_updater.rs` `Maintaining` trait: the interface every periodic
//! background loop (reconciler sync, stuck-batch scanner, scheduler,
//! queued-to-bus adapter) implements, so a coordinator can `tokio::join!`
//! them on a shared tick without knowing their internals.

use async_trait::async_trait;

#[async_trait]
pub trait Maintaining: Send + Sync {
    /// Runs one iteration of this component's background work. Errors are
    /// logged by the caller and never propagated past a single tick — a
    /// failed tick is retried on the next one, matching the teacher's
    /// `let _ = component.run_maintenance().await` call sites.
    async fn run_maintenance(&self) -> anyhow::Result<()>;

    /// Human-readable name used in log lines and error context.
    fn name(&self) -> &str;
}
