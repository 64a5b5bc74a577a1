//! Message-bus wire schemas (§6). Kept separate from the REST-facing
//! entities so a bus payload format change never touches the relational
//! model.
use {
    crate::{
        batch::BatchPayload,
        ids::{BatchId, RecipientId, UserId},
        send_config::SendConfig,
    },
    serde::{Deserialize, Serialize},
};

/// Body of `sys.batch.process`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BatchReadyNotification {
    pub batch_id: BatchId,
    pub user_id: UserId,
}

impl BatchReadyNotification {
    pub fn subject() -> &'static str {
        "sys.batch.process"
    }

    /// Deterministic per batch submission so republishing the same batch
    /// does not fan it out twice.
    pub fn msg_id(batch_id: BatchId) -> String {
        format!("batch:{batch_id}:ready")
    }
}

/// Body of `user.{userId}.chunk`. The send-config and batch payload template
/// are embedded by value so senders never re-query R for them (§4.2 step 5).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChunkMessage {
    pub batch_id: BatchId,
    pub user_id: UserId,
    pub chunk_index: u32,
    pub recipient_ids: Vec<RecipientId>,
    pub send_config: SendConfig,
    pub batch_payload: BatchPayload,
    pub dry_run: bool,
}

impl ChunkMessage {
    pub fn subject(user_id: UserId) -> String {
        format!("user.{user_id}.chunk")
    }

    pub fn msg_id(batch_id: BatchId, chunk_index: u32) -> String {
        format!("batch:{batch_id}:chunk:{chunk_index}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn msg_ids_are_deterministic() {
        let batch = BatchId::new();
        assert_eq!(
            ChunkMessage::msg_id(batch, 3),
            ChunkMessage::msg_id(batch, 3)
        );
        assert_ne!(
            ChunkMessage::msg_id(batch, 3),
            ChunkMessage::msg_id(batch, 4)
        );
    }
}
