//! Leader election (§4.8): exactly one sender-worker replica runs the
//! scheduler/queued-to-bus/stuck-batch-scanner tasks at a time. Tracks
//! leader status the same way the teacher tracks its Postgres advisory
//! lock — a two-state enum, `try_acquire` called once per scheduler tick.

use {
    hot_state::HotStore,
    std::{sync::Arc, time::Duration},
};

/// Tracks leader lock status. Leader lock status is only updated by calls
/// to [`LeaderLockTracker::try_acquire`].
pub enum LeaderLockTracker {
    /// Only one worker replica exists; it always considers itself leader.
    Disabled,
    /// Multiple replicas compete for the lock via `hot_state::HotStore`'s
    /// SET-NX-EX primitives; only the lock holder runs leader-only tasks.
    Enabled {
        store: Arc<dyn HotStore>,
        worker_id: String,
        ttl: Duration,
        is_leader: bool,
        was_leader: bool,
    },
}

impl LeaderLockTracker {
    pub fn disabled() -> Self {
        Self::Disabled
    }

    pub fn enabled(store: Arc<dyn HotStore>, worker_id: String, ttl: Duration) -> Self {
        Self::Enabled {
            store,
            worker_id,
            ttl,
            is_leader: false,
            was_leader: false,
        }
    }

    /// Tries to (re)acquire the leader lock. Should be called at the
    /// beginning of every scheduler tick.
    pub async fn try_acquire(&mut self) {
        let Self::Enabled {
            store,
            worker_id,
            ttl,
            is_leader,
            was_leader,
        } = self
        else {
            return;
        };

        *was_leader = *is_leader;

        let result = if *is_leader {
            store.refresh_leader(worker_id, *ttl).await
        } else {
            store.try_acquire_leader(worker_id, *ttl).await
        };

        *is_leader = result.unwrap_or_else(|err| {
            tracing::error!(?err, "failed to acquire or refresh leader lock");
            Metrics::leader_lock_error();
            false
        });

        if self.just_stepped_up() {
            tracing::info!("stepped up as leader");
            Metrics::leader_step_up();
        } else if self.just_stepped_down() {
            tracing::warn!("lost leader lock unexpectedly");
            Metrics::leader_step_down();
        }
    }

    /// Releases the leader lock if held. Should be called on shutdown.
    pub async fn release(self) {
        if let Self::Enabled {
            store,
            worker_id,
            is_leader: true,
            ..
        } = self
        {
            tracing::info!("shutting down, releasing leader lock");
            let _ = store.release_leader(&worker_id).await;
            Metrics::leader_step_down();
        }
    }

    /// True iff the previous [`try_acquire`](Self::try_acquire) call just
    /// transitioned this instance into the leader role.
    pub fn just_stepped_up(&self) -> bool {
        matches!(
            self,
            Self::Enabled {
                is_leader: true,
                was_leader: false,
                ..
            }
        )
    }

    fn just_stepped_down(&self) -> bool {
        matches!(
            self,
            Self::Enabled {
                is_leader: false,
                was_leader: true,
                ..
            }
        )
    }

    /// Whether this instance should run leader-only tasks right now.
    /// Always true when the lock mechanism is disabled.
    pub fn is_leader(&self) -> bool {
        match self {
            Self::Enabled { is_leader, .. } => *is_leader,
            Self::Disabled => true,
        }
    }
}

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "leader_lock_tracker")]
struct Metrics {
    /// 1 if this worker currently holds the leader lock, 0 otherwise.
    is_leader: prometheus::IntGauge,
    /// Count of errors acquiring or refreshing the leader lock.
    leader_lock_error: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Metrics::instance(observe::metrics::get_storage_registry()).expect("metric registration")
    }

    fn leader_step_up() {
        Self::get().is_leader.set(1)
    }

    fn leader_step_down() {
        Self::get().is_leader.set(0)
    }

    fn leader_lock_error() {
        Self::get().leader_lock_error.inc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_is_always_leader() {
        let tracker = LeaderLockTracker::disabled();
        assert!(tracker.is_leader());
        assert!(!tracker.just_stepped_up());
    }
}
