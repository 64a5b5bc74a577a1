//! Rate limiter (§4.5): a thin wrapper around
//! [`hot_state::HotStore::acquire_rate_limit_token`] that enforces the
//! `1..=500` `perSecond` bound and turns a denied token into a bounded
//! sleep-and-retry loop, so callers in the sender worker never hand-roll
//! backoff around the raw store call.

use {
    hot_state::{FailurePolicy, HotStore},
    model::SendConfigId,
    std::{sync::Arc, time::Duration},
};

pub const MIN_PER_SECOND: u32 = 1;
pub const MAX_PER_SECOND: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("perSecond {0} is out of the 1..=500 bound")]
    OutOfBounds(u32),
    #[error(transparent)]
    Store(#[from] hot_state::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub struct RateLimiter {
    store: Arc<dyn HotStore>,
    failure_policy: FailurePolicy,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn HotStore>, failure_policy: FailurePolicy) -> Self {
        Self { store, failure_policy }
    }

    /// Blocks until a token for `send_config_id` is acquired, sleeping for
    /// the store's reported `retryAfterMs` between attempts. Spec §4.3 step
    /// 4 calls this once per recipient on the critical send path.
    pub async fn acquire(&self, send_config_id: SendConfigId, per_second: u32) -> Result<()> {
        let per_second = clamp_bounds(per_second)?;
        loop {
            let decision = self
                .store
                .acquire_rate_limit_token(send_config_id, per_second, self.failure_policy)
                .await?;
            if decision.allowed {
                return Ok(());
            }
            tracing::debug!(
                %send_config_id,
                retry_after_ms = decision.retry_after_ms,
                "rate limit token denied, backing off"
            );
            tokio::time::sleep(Duration::from_millis(decision.retry_after_ms)).await;
        }
    }
}

fn clamp_bounds(per_second: u32) -> Result<u32> {
    if (MIN_PER_SECOND..=MAX_PER_SECOND).contains(&per_second) {
        Ok(per_second)
    } else {
        Err(Error::OutOfBounds(per_second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_bounds_configuration() {
        assert!(clamp_bounds(0).is_err());
        assert!(clamp_bounds(501).is_err());
        assert!(clamp_bounds(1).is_ok());
        assert!(clamp_bounds(500).is_ok());
    }
}
