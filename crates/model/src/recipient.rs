use {
    crate::ids::{BatchId, RecipientId},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    std::collections::HashMap,
};

/// Recipient lifecycle. Monotonic: a status never moves backwards (§8
/// property 6). `Delivered`, `Bounced`, `Complained`, `Failed` are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum RecipientStatus {
    Pending,
    Queued,
    Sent,
    Delivered,
    Bounced,
    Complained,
    Failed,
}

impl RecipientStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecipientStatus::Delivered
                | RecipientStatus::Bounced
                | RecipientStatus::Complained
                | RecipientStatus::Failed
        )
    }

    fn rank(&self) -> u8 {
        match self {
            RecipientStatus::Pending => 0,
            RecipientStatus::Queued => 1,
            RecipientStatus::Sent => 2,
            RecipientStatus::Delivered | RecipientStatus::Bounced | RecipientStatus::Complained => 3,
            RecipientStatus::Failed => 3,
        }
    }

    /// A transition is valid iff it does not move rank backwards, and a
    /// terminal status never transitions at all. `Sent -> Failed` is not
    /// modeled by rank alone (both are reachable from `Sent`), so it is
    /// allowed explicitly; every other same-rank move is rejected.
    pub fn can_transition_to(&self, next: RecipientStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if *self == RecipientStatus::Sent && next == RecipientStatus::Failed {
            return true;
        }
        next.rank() >= self.rank()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Recipient {
    pub id: RecipientId,
    pub batch_id: BatchId,
    pub identifier: String,
    pub name: Option<String>,
    pub variables: HashMap<String, serde_json::Value>,
    pub status: RecipientStatus,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub bounced_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivered_never_regresses_to_sent() {
        assert!(!RecipientStatus::Delivered.can_transition_to(RecipientStatus::Sent));
    }

    #[test]
    fn pending_to_queued_to_sent_to_delivered_is_valid() {
        assert!(RecipientStatus::Pending.can_transition_to(RecipientStatus::Queued));
        assert!(RecipientStatus::Queued.can_transition_to(RecipientStatus::Sent));
        assert!(RecipientStatus::Sent.can_transition_to(RecipientStatus::Delivered));
    }

    #[test]
    fn sent_can_fail() {
        assert!(RecipientStatus::Sent.can_transition_to(RecipientStatus::Failed));
    }

    #[test]
    fn terminal_statuses_reject_all_transitions() {
        for terminal in [
            RecipientStatus::Delivered,
            RecipientStatus::Bounced,
            RecipientStatus::Complained,
            RecipientStatus::Failed,
        ] {
            for next in [
                RecipientStatus::Pending,
                RecipientStatus::Queued,
                RecipientStatus::Sent,
                RecipientStatus::Delivered,
                RecipientStatus::Bounced,
                RecipientStatus::Complained,
                RecipientStatus::Failed,
            ] {
                assert!(!terminal.can_transition_to(next), "{terminal:?} -> {next:?}");
            }
        }
    }
}
