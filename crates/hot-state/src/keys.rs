use model::{BatchId, SendConfigId};

pub fn counters(batch_id: BatchId) -> String {
    format!("counters:{batch_id}")
}

pub fn recipients(batch_id: BatchId) -> String {
    format!("recipients:{batch_id}")
}

pub fn pending_sync(batch_id: BatchId) -> String {
    format!("pending_sync:{batch_id}")
}

/// Set of batch ids that currently have a non-empty pending-sync set, so the
/// reconciler can enumerate active batches without a Redis `KEYS` scan.
pub const PENDING_SYNC_INDEX: &str = "pending_sync_index";

pub const GLOBAL_PENDING: &str = "global_pending";

pub const LEADER_LOCK: &str = "leader";

pub fn rate_limit_bucket(send_config_id: SendConfigId, window_epoch_secs: i64) -> String {
    format!("rate_limit:{send_config_id}:{window_epoch_secs}")
}

pub fn webhook_dedup(event_id: &str) -> String {
    format!("webhook_dedup:{event_id}")
}
