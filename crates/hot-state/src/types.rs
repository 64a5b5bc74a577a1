use {
    chrono::{DateTime, Utc},
    model::RecipientStatus,
    serde::{Deserialize, Serialize},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub sent: i64,
    pub failed: i64,
    pub total: i64,
}

impl Counters {
    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.sent + self.failed >= self.total
    }
}

/// The hot-state record mirrored into R's `recipients` row on sync.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecipientRecord {
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
}

/// Outcome of a dispatch attempt for one recipient, produced by a module
/// adapter and consumed by the atomic outcome-recording script.
#[derive(Clone, Debug, PartialEq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

/// Return value of the atomic `record_outcome` script (§4.3 step 6).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordOutcomeResult {
    pub counters: Counters,
    pub is_complete: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub retry_after_ms: u64,
}
