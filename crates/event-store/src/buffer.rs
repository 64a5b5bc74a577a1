use crate::EnrichedEvent;

/// Groups enriched webhook events for a single bulk insert, matching spec
/// §4.7's event consumer: "pull messages in batches of ≤100, flush every 1s
/// or when full". Plain in-memory accumulator; the flush timer itself lives
/// in the caller's run loop since it has to race against `tokio::time::sleep`.
pub struct EventBuffer {
    pending: Vec<EnrichedEvent>,
    capacity: usize,
}

impl EventBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds `event`, returning the accumulated batch (and resetting) once
    /// `capacity` is reached.
    pub fn push(&mut self, event: EnrichedEvent) -> Option<Vec<EnrichedEvent>> {
        self.pending.push(event);
        if self.pending.len() >= self.capacity {
            Some(self.take())
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drains whatever has accumulated, regardless of capacity. Called by
    /// the caller's 1s flush timer.
    pub fn take(&mut self) -> Vec<EnrichedEvent> {
        std::mem::take(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use {super::*, chrono::Utc, model::webhook_event::{EventType, Provider, WebhookEvent}};

    fn sample_event() -> EnrichedEvent {
        let event = WebhookEvent {
            id: "id".to_owned(),
            provider: Provider::Resend,
            event_type: EventType::Delivered,
            provider_message_id: "pm-1".to_owned(),
            timestamp: Utc::now(),
            metadata: serde_json::Value::Null,
            raw_event: serde_json::Value::Null,
            module_id: None,
        };
        EnrichedEvent {
            event,
            recipient_id: model::RecipientId::new(),
            batch_id: model::BatchId::new(),
            user_id: model::UserId::new(),
        }
    }

    #[test]
    fn flushes_at_capacity() {
        let mut buffer = EventBuffer::new(2);
        assert!(buffer.push(sample_event()).is_none());
        let flushed = buffer.push(sample_event()).expect("capacity reached");
        assert_eq!(flushed.len(), 2);
        assert!(buffer.is_empty());
    }

    #[test]
    fn take_drains_partial_batch() {
        let mut buffer = EventBuffer::new(100);
        buffer.push(sample_event());
        let flushed = buffer.take();
        assert_eq!(flushed.len(), 1);
        assert!(buffer.is_empty());
    }
}
