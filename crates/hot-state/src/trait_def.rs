use {
    crate::{
        error::Result,
        store::FailurePolicy,
        types::{Counters, DispatchOutcome, RateLimitDecision, RecipientRecord, RecordOutcomeResult},
    },
    async_trait::async_trait,
    model::{BatchId, RecipientId, SendConfigId},
    std::{collections::HashMap, time::Duration},
};

/// The hot-state interface (§2, §3, §9's "pass interfaces into
/// constructors" rule): every atomic, low-latency operation on the critical
/// path. `HotState` is the Redis-backed implementation; `testlib` provides
/// an in-memory fake implementing the same trait for tests that don't want
/// a real Redis.
#[async_trait]
pub trait HotStore: Send + Sync {
    async fn init_counters(&self, batch_id: BatchId, total: i64) -> Result<Counters>;
    async fn get_counters(&self, batch_id: BatchId) -> Result<Option<Counters>>;
    async fn get_recipient_record(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
    ) -> Result<Option<RecipientRecord>>;
    async fn get_recipient_records(
        &self,
        batch_id: BatchId,
        recipient_ids: &[RecipientId],
    ) -> Result<HashMap<RecipientId, RecipientRecord>>;
    async fn record_outcome(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
        outcome: &DispatchOutcome,
    ) -> Result<RecordOutcomeResult>;
    async fn shrink_ttl_after_completion(&self, batch_id: BatchId) -> Result<()>;
    async fn active_batches(&self) -> Result<Vec<BatchId>>;
    async fn pending_sync_ids(&self, batch_id: BatchId, limit: usize) -> Result<Vec<RecipientId>>;
    async fn remove_from_pending_sync(&self, batch_id: BatchId, ids: &[RecipientId]) -> Result<()>;
    async fn add_global_pending(&self, delta: i64) -> Result<i64>;
    async fn global_pending(&self) -> Result<i64>;
    async fn acquire_rate_limit_token(
        &self,
        send_config_id: SendConfigId,
        limit_per_second: u32,
        policy: FailurePolicy,
    ) -> Result<RateLimitDecision>;
    async fn try_acquire_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool>;
    async fn refresh_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool>;
    async fn release_leader(&self, worker_id: &str) -> Result<()>;
    async fn mark_webhook_seen(&self, event_id: &str) -> Result<bool>;
    fn is_circuit_open(&self) -> bool;
}
