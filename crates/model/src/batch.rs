use {
    crate::ids::{BatchId, SendConfigId, UserId},
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Batch lifecycle, §4.1. `Completed` and `Failed` are terminal: no method
/// on this type ever reports a transition out of them.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum BatchStatus {
    Draft,
    Scheduled,
    Queued,
    Processing,
    Completed,
    Failed,
    Paused,
}

impl BatchStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Validates one edge of the state machine in spec §4.1. System-driven
    /// and user-driven transitions share this table; callers distinguish
    /// who's allowed to invoke which edge, not what edges exist.
    pub fn can_transition_to(&self, next: BatchStatus) -> bool {
        use BatchStatus::*;
        matches!(
            (self, next),
            (Draft, Queued)
                | (Draft, Scheduled)
                | (Scheduled, Queued)
                | (Queued, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Paused)
                | (Paused, Queued)
                | (Processing, Queued)
        )
    }
}

/// Polymorphic payload template, keyed on the owning send-config's module.
/// Request-level overrides and per-recipient fields are layered on top at
/// send time (§4.3 step 3), never stored here.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "module", rename_all = "lowercase")]
pub enum BatchPayload {
    Email(EmailPayload),
    Webhook(WebhookPayload),
    Sms(SmsPayload),
    Push(PushPayload),
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
    pub from_email: Option<String>,
    pub subject: Option<String>,
    pub html_content: Option<String>,
    pub text_content: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload(pub serde_json::Value);

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SmsPayload {
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: Option<String>,
    pub body: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Batch {
    pub id: BatchId,
    pub user_id: UserId,
    pub send_config_id: Option<SendConfigId>,
    pub name: String,
    pub status: BatchStatus,
    pub payload: BatchPayload,
    pub total_recipients: i64,
    pub sent_count: i64,
    pub failed_count: i64,
    pub delivered_count: i64,
    pub bounced_count: i64,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
}

impl Batch {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// §8 property 2: once all recipients are terminal, the batch is done.
    pub fn is_fully_terminal(&self) -> bool {
        self.sent_count + self.failed_count >= self.total_recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_rejects_backwards_transitions() {
        assert!(BatchStatus::Draft.can_transition_to(BatchStatus::Queued));
        assert!(!BatchStatus::Completed.can_transition_to(BatchStatus::Processing));
        assert!(!BatchStatus::Failed.can_transition_to(BatchStatus::Queued));
        assert!(BatchStatus::Processing.can_transition_to(BatchStatus::Paused));
        assert!(BatchStatus::Paused.can_transition_to(BatchStatus::Queued));
        assert!(!BatchStatus::Queued.can_transition_to(BatchStatus::Completed));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for next in [
            BatchStatus::Draft,
            BatchStatus::Scheduled,
            BatchStatus::Queued,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Failed,
            BatchStatus::Paused,
        ] {
            assert!(!BatchStatus::Completed.can_transition_to(next));
            assert!(!BatchStatus::Failed.can_transition_to(next));
        }
    }
}
