//! In-memory [`HotStore`] fake, grounded in the teacher's convention of
//! pairing a real-backend implementation with a test double behind the same
//! trait. Lets sender-worker/reconciler tests exercise atomic-outcome and
//! rate-limit logic without a real Redis instance.
use {
    async_trait::async_trait,
    hot_state::{
        Counters, DispatchOutcome, Error, FailurePolicy, HotStore, RateLimitDecision,
        RecipientRecord, RecordOutcomeResult, Result,
    },
    model::{BatchId, RecipientId, RecipientStatus, SendConfigId},
    std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
        time::{Duration, Instant},
    },
};

#[derive(Default)]
struct State {
    counters: HashMap<BatchId, Counters>,
    records: HashMap<(BatchId, RecipientId), RecipientRecord>,
    pending_sync: HashMap<BatchId, HashSet<RecipientId>>,
    global_pending: i64,
    leader: Option<(String, Instant)>,
    webhook_seen: HashSet<String>,
}

/// Set to `true` via [`FakeHotStore::open_circuit`] to exercise fail-open/
/// fail-closed call sites the same way a real circuit breaker trip would.
pub struct FakeHotStore {
    state: Mutex<State>,
    circuit_open: std::sync::atomic::AtomicBool,
}

impl FakeHotStore {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::default()), circuit_open: std::sync::atomic::AtomicBool::new(false) }
    }

    pub fn open_circuit(&self) {
        self.circuit_open.store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

impl Default for FakeHotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HotStore for FakeHotStore {
    async fn init_counters(&self, batch_id: BatchId, total: i64) -> Result<Counters> {
        let mut state = self.state.lock().unwrap();
        let counters = state
            .counters
            .entry(batch_id)
            .or_insert(Counters { sent: 0, failed: 0, total })
            .clone();
        Ok(counters)
    }

    async fn get_counters(&self, batch_id: BatchId) -> Result<Option<Counters>> {
        Ok(self.state.lock().unwrap().counters.get(&batch_id).copied())
    }

    async fn get_recipient_record(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
    ) -> Result<Option<RecipientRecord>> {
        Ok(self.state.lock().unwrap().records.get(&(batch_id, recipient_id)).cloned())
    }

    async fn get_recipient_records(
        &self,
        batch_id: BatchId,
        recipient_ids: &[RecipientId],
    ) -> Result<HashMap<RecipientId, RecipientRecord>> {
        let state = self.state.lock().unwrap();
        Ok(recipient_ids
            .iter()
            .filter_map(|id| state.records.get(&(batch_id, *id)).map(|r| (*id, r.clone())))
            .collect())
    }

    async fn record_outcome(
        &self,
        batch_id: BatchId,
        recipient_id: RecipientId,
        outcome: &DispatchOutcome,
    ) -> Result<RecordOutcomeResult> {
        if self.circuit_open.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(Error::CircuitOpen);
        }
        let mut state = self.state.lock().unwrap();
        let already_recorded = state.records.contains_key(&(batch_id, recipient_id));

        let counters = state.counters.entry(batch_id).or_insert(Counters::default());
        if !already_recorded {
            if outcome.success {
                counters.sent += 1;
            } else {
                counters.failed += 1;
            }
        }
        let counters = *counters;

        state.records.insert(
            (batch_id, recipient_id),
            RecipientRecord {
                status: if outcome.success { RecipientStatus::Sent } else { RecipientStatus::Failed },
                sent_at: outcome.success.then(chrono::Utc::now),
                provider_message_id: outcome.provider_message_id.clone(),
                error_message: outcome.error.clone(),
            },
        );
        state.pending_sync.entry(batch_id).or_default().insert(recipient_id);

        Ok(RecordOutcomeResult { counters, is_complete: counters.is_complete() })
    }

    async fn shrink_ttl_after_completion(&self, _batch_id: BatchId) -> Result<()> {
        Ok(())
    }

    async fn active_batches(&self) -> Result<Vec<BatchId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .counters
            .iter()
            .filter(|(_, counters)| !counters.is_complete())
            .map(|(id, _)| *id)
            .collect())
    }

    async fn pending_sync_ids(&self, batch_id: BatchId, limit: usize) -> Result<Vec<RecipientId>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .pending_sync
            .get(&batch_id)
            .map(|ids| ids.iter().take(limit).copied().collect())
            .unwrap_or_default())
    }

    async fn remove_from_pending_sync(&self, batch_id: BatchId, ids: &[RecipientId]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if let Some(pending) = state.pending_sync.get_mut(&batch_id) {
            for id in ids {
                pending.remove(id);
            }
        }
        Ok(())
    }

    async fn add_global_pending(&self, delta: i64) -> Result<i64> {
        let mut state = self.state.lock().unwrap();
        state.global_pending += delta;
        Ok(state.global_pending)
    }

    async fn global_pending(&self) -> Result<i64> {
        Ok(self.state.lock().unwrap().global_pending)
    }

    /// Always allows — rate limiting is exercised against the real
    /// [`rate_limiter::RateLimiter`] in its own unit tests, not here.
    async fn acquire_rate_limit_token(
        &self,
        _send_config_id: SendConfigId,
        _limit_per_second: u32,
        _policy: FailurePolicy,
    ) -> Result<RateLimitDecision> {
        Ok(RateLimitDecision { allowed: true, retry_after_ms: 0 })
    }

    async fn try_acquire_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();
        let expired = state.leader.as_ref().map_or(true, |(_, expiry)| *expiry <= now);
        if expired || state.leader.as_ref().map(|(id, _)| id.as_str()) == Some(worker_id) {
            state.leader = Some((worker_id.to_owned(), now + ttl));
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn refresh_leader(&self, worker_id: &str, ttl: Duration) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match &state.leader {
            Some((id, _)) if id == worker_id => {
                state.leader = Some((worker_id.to_owned(), Instant::now() + ttl));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release_leader(&self, worker_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.leader.as_ref().map(|(id, _)| id.as_str()) == Some(worker_id) {
            state.leader = None;
        }
        Ok(())
    }

    async fn mark_webhook_seen(&self, event_id: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.webhook_seen.insert(event_id.to_owned()))
    }

    fn is_circuit_open(&self) -> bool {
        self.circuit_open.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn record_outcome_is_idempotent_on_retry() {
        let store = FakeHotStore::new();
        let batch_id = BatchId::new();
        let recipient_id = RecipientId::new();
        store.init_counters(batch_id, 1).await.unwrap();

        let outcome = DispatchOutcome { success: true, provider_message_id: Some("m-1".into()), error: None };
        let first = store.record_outcome(batch_id, recipient_id, &outcome).await.unwrap();
        let second = store.record_outcome(batch_id, recipient_id, &outcome).await.unwrap();

        assert_eq!(first.counters.sent, 1);
        assert_eq!(second.counters.sent, 1);
        assert!(second.is_complete);
    }

    #[tokio::test]
    async fn leader_election_is_exclusive_until_expiry() {
        let store = FakeHotStore::new();
        assert!(store.try_acquire_leader("a", Duration::from_millis(10)).await.unwrap());
        assert!(!store.try_acquire_leader("b", Duration::from_millis(10)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(store.try_acquire_leader("b", Duration::from_millis(10)).await.unwrap());
    }

    #[tokio::test]
    async fn open_circuit_fails_record_outcome() {
        let store = FakeHotStore::new();
        store.open_circuit();
        let outcome = DispatchOutcome { success: true, provider_message_id: None, error: None };
        let result = store.record_outcome(BatchId::new(), RecipientId::new(), &outcome).await;
        assert!(matches!(result, Err(Error::CircuitOpen)));
    }
}
