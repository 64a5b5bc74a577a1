use {
    crate::{
        circuit_breaker::CircuitBreaker,
        error::{Error, Result},
        keys,
        scripts,
        trait_def::HotStore,
        types::{Counters, DispatchOutcome, RateLimitDecision, RecipientRecord, RecordOutcomeResult},
    },
    async_trait::async_trait,
    chrono::Utc,
    model::{BatchId, RecipientId, RecipientStatus, SendConfigId},
    redis::{aio::ConnectionManager, AsyncCommands, Script},
    std::{collections::HashMap, sync::Arc, time::Duration},
};

const ACTIVE_TTL_SECS: i64 = 7 * 24 * 60 * 60;
const COMPLETED_TTL_SECS: i64 = 48 * 60 * 60;
const WEBHOOK_DEDUP_TTL_MS: i64 = 5 * 60 * 1000;

/// Whether a caller treats a circuit-open hot-state client as a hard failure
/// (idempotency-critical path) or degrades gracefully (§5: circuit breakers
/// wrap the hot-state client ... non-critical operations may fail open).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailurePolicy {
    FailClosed,
    FailOpen,
}

/// Thin, cheaply-cloneable handle around the Redis connection, matching the
/// teacher's `Postgres` wrapper shape (`crates/autopilot/src/database.rs`):
/// a pure connection holder constructed once at binary start.
#[derive(Clone)]
pub struct HotState {
    conn: ConnectionManager,
    breaker: Arc<CircuitBreaker>,
}

impl HotState {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            breaker: Arc::new(CircuitBreaker::new()),
        })
    }

    fn guard(&self, policy: FailurePolicy) -> std::result::Result<(), RateLimitDecision> {
        if self.breaker.allow() {
            Ok(())
        } else {
            match policy {
                FailurePolicy::FailClosed => Err(RateLimitDecision {
                    allowed: false,
                    retry_after_ms: 1000,
                }),
                FailurePolicy::FailOpen => Err(RateLimitDecision {
                    allowed: true,
                    retry_after_ms: 0,
                }),
            }
        }
    }

    fn record(&self, succeeded: bool) {
        if succeeded {
            self.breaker.record_success();
        } else {
            self.breaker.record_failure();
        }
    }

}

#[async_trait]
impl HotStore for HotState {
    fn is_circuit_open(&self) -> bool {
        self.breaker.is_open()
    }

    // ---- counters / recipients ---------------------------------------

    async fn init_counters(&self, batch_id: BatchId, total: i64) -> Result<Counters> {
        if !self.breaker.allow() {
            return Err(Error::CircuitOpen);
        }
        let mut conn = self.conn.clone();
        let result: std::result::Result<Vec<Option<i64>>, _> = Script::new(scripts::INIT_COUNTERS)
            .key(keys::counters(batch_id))
            .arg(total)
            .arg(ACTIVE_TTL_SECS)
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        let values = result?;
        Ok(Counters {
            sent: values.first().copied().flatten().unwrap_or(0),
            failed: values.get(1).copied().flatten().unwrap_or(0),
            total: values.get(2).copied().flatten().unwrap_or(total),
        })
    }

    async fn get_counters(&self, batch_id: BatchId) -> Result<Option<Counters>> {
        if !self.breaker.allow() {
            return Err(Error::CircuitOpen);
        }
        let mut conn = self.conn.clone();
        let result: std::result::Result<Vec<Option<i64>>, _> =
            conn.hget(keys::counters(batch_id), &["sent", "failed", "total"]).await;
        self.record(result.is_ok());
        let values = result?;
        if values.iter().all(Option::is_none) {
            return Ok(None);
        }
        Ok(Some(Counters {
            sent: values.first().copied().flatten().unwrap_or(0),
            failed: values.get(1).copied().flatten().unwrap_or(0),
            total: values.get(2).copied().flatten().unwrap_or(0),
        }))
    }

    /// Idempotency sweep (§4.3 step 1). Fail-safe: a circuit-open store
    /// always errors here rather than returning "no record" by default,
    /// because a caller treating that as "not yet sent" would risk a
    /// duplicate provider call.
    async fn get_recipient_record(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
    ) -> Result<Option<RecipientRecord>> {
        if !self.breaker.allow() {
            return Err(Error::CircuitOpen);
        }
        let mut conn = self.conn.clone();
        let result: std::result::Result<Option<String>, _> = conn
            .hget(keys::recipients(batch_id), recipient_id.to_string())
            .await;
        self.record(result.is_ok());
        match result? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn get_recipient_records(
        &self,
        batch_id: BatchId,
        recipient_ids: &[RecipientId],
    ) -> Result<HashMap<RecipientId, RecipientRecord>> {
        if recipient_ids.is_empty() {
            return Ok(HashMap::new());
        }
        if !self.breaker.allow() {
            return Err(Error::CircuitOpen);
        }
        let mut conn = self.conn.clone();
        let fields: Vec<String> = recipient_ids.iter().map(ToString::to_string).collect();
        let result: std::result::Result<Vec<Option<String>>, _> =
            conn.hget(keys::recipients(batch_id), fields).await;
        self.record(result.is_ok());
        let values = result?;
        let mut out = HashMap::new();
        for (id, value) in recipient_ids.iter().zip(values) {
            if let Some(json) = value {
                out.insert(*id, serde_json::from_str(&json)?);
            }
        }
        Ok(out)
    }

    /// Atomic outcome recording (§4.3 step 6). Always fail-closed: a lost
    /// outcome write here is the one failure mode that can duplicate a
    /// send, so it always nacks rather than degrading.
    async fn record_outcome(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
        outcome: &DispatchOutcome,
    ) -> Result<RecordOutcomeResult> {
        if !self.breaker.allow() {
            return Err(Error::CircuitOpen);
        }
        let record = RecipientRecord {
            status: if outcome.success {
                RecipientStatus::Sent
            } else {
                RecipientStatus::Failed
            },
            sent_at: outcome.success.then(Utc::now),
            provider_message_id: outcome.provider_message_id.clone(),
            error_message: outcome.error.clone(),
        };
        let record_json = serde_json::to_string(&record)?;
        let mut conn = self.conn.clone();
        let result: std::result::Result<Vec<i64>, _> = Script::new(scripts::RECORD_OUTCOME)
            .key(keys::counters(batch_id))
            .key(keys::recipients(batch_id))
            .key(keys::pending_sync(batch_id))
            .key(keys::PENDING_SYNC_INDEX)
            .arg(recipient_id.to_string())
            .arg(if outcome.success { "1" } else { "0" })
            .arg(record_json)
            .arg(batch_id.to_string())
            .arg(ACTIVE_TTL_SECS)
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        let values = result?;
        let counters = Counters {
            sent: values.first().copied().unwrap_or_default(),
            failed: values.get(1).copied().unwrap_or_default(),
            total: values.get(2).copied().unwrap_or_default(),
        };
        Ok(RecordOutcomeResult {
            counters,
            is_complete: counters.is_complete(),
        })
    }

    async fn shrink_ttl_after_completion(&self, batch_id: BatchId) -> Result<()> {
        let mut conn = self.conn.clone();
        let result: std::result::Result<String, _> = Script::new(scripts::SHRINK_TTL)
            .key(keys::counters(batch_id))
            .arg(COMPLETED_TTL_SECS)
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        result?;
        Ok(())
    }

    // ---- pending-sync ---------------------------------------------------

    async fn active_batches(&self) -> Result<Vec<BatchId>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(keys::PENDING_SYNC_INDEX).await?;
        Ok(ids.into_iter().filter_map(|s| s.parse().ok()).collect())
    }

    async fn pending_sync_ids(&self, batch_id: BatchId, limit: usize) -> Result<Vec<RecipientId>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .srandmember_multiple(keys::pending_sync(batch_id), limit)
            .await?;
        Ok(ids.into_iter().filter_map(|s| s.parse().ok()).collect())
    }

    async fn remove_from_pending_sync(&self, batch_id: BatchId, ids: &[RecipientId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.clone();
        let fields: Vec<String> = ids.iter().map(ToString::to_string).collect();
        let _: i64 = conn.srem(keys::pending_sync(batch_id), fields).await?;
        let remaining: i64 = conn.scard(keys::pending_sync(batch_id)).await?;
        if remaining == 0 {
            let _: i64 = conn.srem(keys::PENDING_SYNC_INDEX, batch_id.to_string()).await?;
        }
        Ok(())
    }

    // ---- global pending gauge -------------------------------------------

    async fn add_global_pending(&self, delta: i64) -> Result<i64> {
        if delta == 0 {
            return self.global_pending().await;
        }
        let mut conn = self.conn.clone();
        Ok(conn.incr(keys::GLOBAL_PENDING, delta).await?)
    }

    async fn global_pending(&self) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(keys::GLOBAL_PENDING).await?;
        Ok(value.unwrap_or(0))
    }

    // ---- rate limiting ----------------------------------------------------

    async fn acquire_rate_limit_token(
        &self,
        send_config_id: SendConfigId,
        limit_per_second: u32,
        policy: FailurePolicy,
    ) -> Result<RateLimitDecision> {
        if let Err(decision) = self.guard(policy) {
            return Ok(decision);
        }
        let window = Utc::now().timestamp();
        let mut conn = self.conn.clone();
        let result: std::result::Result<(i64, i64), _> = Script::new(scripts::RATE_LIMIT_ACQUIRE)
            .key(keys::rate_limit_bucket(send_config_id, window))
            .arg(limit_per_second)
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        let (allowed, retry_after_ms) = result?;
        Ok(RateLimitDecision {
            allowed: allowed == 1,
            retry_after_ms: retry_after_ms as u64,
        })
    }

    // ---- leader election ----------------------------------------------------

    async fn try_acquire_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let result: std::result::Result<i64, _> = Script::new(scripts::LEADER_ACQUIRE)
            .key(keys::LEADER_LOCK)
            .arg(worker_id)
            .arg(ttl.as_secs())
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        Ok(result? == 1)
    }

    async fn refresh_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();
        let result: std::result::Result<i64, _> = Script::new(scripts::LEADER_REFRESH)
            .key(keys::LEADER_LOCK)
            .arg(worker_id)
            .arg(ttl.as_secs())
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        Ok(result? == 1)
    }

    async fn release_leader(&self, worker_id: &str) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = Script::new(scripts::LEADER_RELEASE)
            .key(keys::LEADER_LOCK)
            .arg(worker_id)
            .invoke_async(&mut conn)
            .await?;
        Ok(())
    }

    // ---- webhook dedup ----------------------------------------------------

    /// Returns `true` if this call is the first to see `event_id` (layer 1
    /// of §4.7's dedup strategy is the bus; this is layer 2's backstop at
    /// the store level for consumers sharing a hot-state instance).
    async fn mark_webhook_seen(&self, event_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let result: std::result::Result<i64, _> = Script::new(scripts::WEBHOOK_DEDUP_CHECK)
            .key(keys::webhook_dedup(event_id))
            .arg(WEBHOOK_DEDUP_TTL_MS)
            .invoke_async(&mut conn)
            .await;
        self.record(result.is_ok());
        Ok(result? == 1)
    }
}
