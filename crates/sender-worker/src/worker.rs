//! Sender Worker per-chunk algorithm (§4.3).

use {
    event_store::EventStore,
    hot_state::{DispatchOutcome, HotStore},
    model::{
        batch::BatchPayload,
        payload::{self, PayloadError},
        wire::ChunkMessage,
        Recipient, RecipientId, SendConfig, SendConfigPayload,
    },
    modules::RecipientPayload,
    rate_limiter::RateLimiter,
    sqlx::PgPool,
    std::sync::Arc,
};

#[derive(prometheus_metric_storage::MetricStorage)]
#[metric(subsystem = "sender_worker")]
struct Metrics {
    /// Chunks processed, labeled by terminal outcome.
    #[metric(labels("outcome"))]
    chunks_processed: prometheus::IntCounterVec,
    /// Recipients dispatched, labeled by success/failure.
    #[metric(labels("result"))]
    recipients_dispatched: prometheus::IntCounterVec,
    /// Recipients dropped by the idempotency sweep (already terminal).
    idempotent_skips: prometheus::IntCounter,
}

impl Metrics {
    fn get() -> &'static Self {
        Self::instance(observe::metrics::get_storage_registry()).expect("metric registration")
    }
}

pub struct ChunkWorker {
    pool: PgPool,
    hot_state: Arc<dyn HotStore>,
    event_store: EventStore,
    rate_limiter: RateLimiter,
    http_client: reqwest::Client,
}

impl ChunkWorker {
    pub fn new(
        pool: PgPool,
        hot_state: Arc<dyn HotStore>,
        event_store: EventStore,
        rate_limiter: RateLimiter,
        http_client: reqwest::Client,
    ) -> Self {
        Self {
            pool,
            hot_state,
            event_store,
            rate_limiter,
            http_client,
        }
    }

    pub async fn process_chunk(&self, message: &ChunkMessage) -> anyhow::Result<()> {
        // Step 1: idempotency sweep, fail-safe on an open circuit breaker.
        let records = self
            .hot_state
            .get_recipient_records(message.batch_id, &message.recipient_ids)
            .await?;
        let surviving: Vec<RecipientId> = message
            .recipient_ids
            .iter()
            .copied()
            .filter(|id| !records.get(id).is_some_and(|r| r.status.is_terminal()))
            .collect();

        Metrics::get()
            .idempotent_skips
            .inc_by((message.recipient_ids.len() - surviving.len()) as u64);

        if surviving.is_empty() {
            Metrics::get().chunks_processed.with_label_values(&["empty"]).inc();
            return Ok(());
        }

        // Step 2: load the surviving recipient rows from R.
        let mut conn = self.pool.acquire().await?;
        let recipients =
            database::recipients::fetch_by_ids(&mut conn, message.batch_id, &surviving).await?;
        drop(conn);

        // Step 3: build per-recipient payloads.
        let mut items = Vec::with_capacity(recipients.len());
        let mut immediate_failures = Vec::new();
        for recipient in &recipients {
            match build_payload(&message.send_config.config, &message.batch_payload, recipient) {
                Ok(payload) => items.push((recipient.id, payload)),
                Err(err) => immediate_failures.push((recipient.id, err)),
            }
        }

        // Step 4: one rate-limit token per dispatch call, since the module
        // may fold the whole chunk into a single provider request.
        if !items.is_empty() {
            self.rate_limiter
                .acquire(
                    send_config_id(&message.send_config),
                    message.send_config.tokens_per_second(),
                )
                .await?;
        }

        // Step 5: dispatch.
        let sender = modules::build_sender(&message.send_config.config, self.http_client.clone());
        let results = if items.is_empty() {
            Vec::new()
        } else {
            modules::dispatch(&*sender, items, message.dry_run).await?
        };

        // Step 6-7: record outcomes atomically, decrement global pending.
        let mut newly_terminal = 0i64;
        for result in results {
            let outcome = DispatchOutcome {
                success: result.success,
                provider_message_id: result.provider_message_id.clone(),
                error: result.error.clone(),
            };
            self.record_and_index(message, result.recipient_id, &outcome).await?;
            newly_terminal += 1;
            Metrics::get()
                .recipients_dispatched
                .with_label_values(&[if result.success { "success" } else { "failure" }])
                .inc();
        }
        for (recipient_id, err) in immediate_failures {
            let outcome = DispatchOutcome {
                success: false,
                provider_message_id: None,
                error: Some(err.to_string()),
            };
            self.record_and_index(message, recipient_id, &outcome).await?;
            newly_terminal += 1;
            Metrics::get().recipients_dispatched.with_label_values(&["failure"]).inc();
        }

        if newly_terminal > 0 {
            self.hot_state.add_global_pending(-newly_terminal).await?;
        }

        Metrics::get().chunks_processed.with_label_values(&["ok"]).inc();
        Ok(())
    }

    async fn record_and_index(
        &self,
        message: &ChunkMessage,
        recipient_id: RecipientId,
        outcome: &DispatchOutcome,
    ) -> anyhow::Result<()> {
        self.hot_state
            .record_outcome(message.batch_id, recipient_id, outcome)
            .await?;
        if let Some(provider_message_id) = &outcome.provider_message_id {
            self.event_store
                .index_provider_message_id(
                    provider_message_id,
                    recipient_id,
                    message.batch_id,
                    message.user_id,
                )
                .await?;
        }
        Ok(())
    }
}

fn send_config_id(send_config: &SendConfig) -> model::SendConfigId {
    send_config.id
}

/// §4.3 step 3: layering is batch payload < send-config defaults, with the
/// recipient's own identifier/variables substituted in by the builder.
/// Request-level overrides are resolved into the batch payload at batch
/// creation time, so this is the final composition step.
fn build_payload(
    config: &SendConfigPayload,
    batch_payload: &BatchPayload,
    recipient: &Recipient,
) -> Result<RecipientPayload, PayloadError> {
    match (config, batch_payload) {
        (SendConfigPayload::Email(config), BatchPayload::Email(payload)) => {
            payload::build_email(config, payload, recipient).map(RecipientPayload::Email)
        }
        (SendConfigPayload::Webhook(_), BatchPayload::Webhook(payload)) => {
            Ok(RecipientPayload::Webhook(payload::build_webhook(payload, recipient)))
        }
        (SendConfigPayload::Sms(_), BatchPayload::Sms(payload)) => {
            payload::build_sms(payload, recipient).map(RecipientPayload::Sms)
        }
        (SendConfigPayload::Push(_), BatchPayload::Push(payload)) => {
            payload::build_push(payload, recipient).map(RecipientPayload::Push)
        }
        _ => Err(PayloadError::MissingField(
            "batch payload module does not match send-config module",
        )),
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        model::{
            batch::{EmailPayload, SmsPayload},
            ids::{BatchId, RecipientId},
            recipient::RecipientStatus,
            send_config::{EmailConfig, EmailProvider, SmsConfig, SmsProvider},
        },
        std::collections::HashMap,
    };

    fn recipient(identifier: &str) -> Recipient {
        Recipient {
            id: RecipientId::new(),
            batch_id: BatchId::new(),
            identifier: identifier.to_owned(),
            name: None,
            variables: HashMap::new(),
            status: RecipientStatus::Pending,
            provider_message_id: None,
            error_message: None,
            sent_at: None,
            delivered_at: None,
            bounced_at: None,
        }
    }

    #[test]
    fn builds_email_message_from_matching_payload() {
        let config = SendConfigPayload::Email(EmailConfig {
            provider: EmailProvider::Mock,
            from_email: "from@test.com".into(),
            api_key_ref: "key".into(),
        });
        let batch_payload = BatchPayload::Email(EmailPayload {
            from_email: None,
            subject: Some("hi".into()),
            html_content: Some("<b>hi</b>".into()),
            text_content: None,
        });
        let result = build_payload(&config, &batch_payload, &recipient("a@test.com"));
        assert!(matches!(result, Ok(RecipientPayload::Email(_))));
    }

    #[test]
    fn mismatched_module_is_rejected() {
        let config = SendConfigPayload::Sms(SmsConfig {
            provider: SmsProvider::Mock,
            from_number: "+10000000000".into(),
            api_key_ref: "key".into(),
            max_parallel: 10,
        });
        let batch_payload = BatchPayload::Email(EmailPayload::default());
        let result = build_payload(&config, &batch_payload, &recipient("+19999999999"));
        assert!(result.is_err());
    }

    #[test]
    fn sms_builder_requires_a_message() {
        let config = SendConfigPayload::Sms(SmsConfig {
            provider: SmsProvider::Mock,
            from_number: "+10000000000".into(),
            api_key_ref: "key".into(),
            max_parallel: 10,
        });
        let batch_payload = BatchPayload::Sms(SmsPayload { message: None });
        let result = build_payload(&config, &batch_payload, &recipient("+19999999999"));
        assert_eq!(result, Err(PayloadError::MissingField("message")));
    }
}
