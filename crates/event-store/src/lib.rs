//! Event store (E): append-only analytical store for delivery events plus a
//! `providerMessageId → (recipient, batch, user)` lookup index, per spec
//! §6's `email_events`/`email_message_index` tables. Grounded in the
//! teacher's `database::Postgres` wrapper shape, adapted to a separate pool
//! since E is intentionally write-heavy/append-only and may live on its own
//! instance in production.

pub mod buffer;
pub mod error;

pub use {buffer::EventBuffer, error::Error};

use {
    chrono::{DateTime, Utc},
    model::{BatchId, RecipientId, UserId, WebhookEvent},
    sqlx::PgPool,
};

pub type Result<T> = std::result::Result<T, Error>;

/// An event enriched with the identity it was resolved against via the
/// lookup index (spec §4.7 event consumer: "enrich; resolve
/// providerMessageId → (recipientId, batchId, userId)").
#[derive(Clone, Debug)]
pub struct EnrichedEvent {
    pub event: WebhookEvent,
    pub recipient_id: RecipientId,
    pub batch_id: BatchId,
    pub user_id: UserId,
}

#[derive(Clone)]
pub struct EventStore {
    pool: PgPool,
}

impl EventStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    /// Seeds the lookup index when a provider message id is first assigned
    /// (Sender Worker's `record_outcome`, once a dispatch succeeds).
    pub async fn index_provider_message_id(
        &self,
        provider_message_id: &str,
        recipient_id: RecipientId,
        batch_id: BatchId,
        user_id: UserId,
    ) -> Result<()> {
        const QUERY: &str = r#"
INSERT INTO email_message_index (provider_message_id, recipient_id, batch_id, user_id, created_at)
VALUES ($1, $2, $3, $4, now())
ON CONFLICT (provider_message_id) DO NOTHING
"#;
        sqlx::query(QUERY)
            .bind(provider_message_id)
            .bind(recipient_id)
            .bind(batch_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Webhook event consumer's enrichment step.
    pub async fn lookup(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<(RecipientId, BatchId, UserId)>> {
        const QUERY: &str = r#"
SELECT recipient_id, batch_id, user_id FROM email_message_index WHERE provider_message_id = $1
"#;
        let row: Option<(RecipientId, BatchId, UserId)> = sqlx::query_as(QUERY)
            .bind(provider_message_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Bulk-appends a flushed [`EventBuffer`] to the analytical table in one
    /// round trip, matching the reconciler/recipients data-driven-join style
    /// used throughout this workspace for batched writes.
    pub async fn append_events(&self, events: &[EnrichedEvent]) -> Result<()> {
        if events.is_empty() {
            return Ok(());
        }
        let rows: Vec<EventRow> = events.iter().map(EventRow::from).collect();
        let payload = serde_json::to_value(&rows).expect("event rows serialize infallibly");
        const QUERY: &str = r#"
INSERT INTO email_events (
    event_id, event_type, batch_id, recipient_id, user_id, email,
    provider_message_id, metadata_json, error_message, created_at, event_date
)
SELECT
    e.event_id, e.event_type, e.batch_id, e.recipient_id, e.user_id, e.email,
    e.provider_message_id, e.metadata_json, e.error_message, e.created_at, e.created_at::date
FROM jsonb_to_recordset($1::jsonb) AS e(
    event_id text,
    event_type text,
    batch_id uuid,
    recipient_id uuid,
    user_id uuid,
    email text,
    provider_message_id text,
    metadata_json jsonb,
    error_message text,
    created_at timestamptz
)
ON CONFLICT (event_id) DO NOTHING
"#;
        sqlx::query(QUERY)
            .bind(payload)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(serde::Serialize)]
struct EventRow {
    event_id: String,
    event_type: String,
    batch_id: BatchId,
    recipient_id: RecipientId,
    user_id: UserId,
    email: String,
    provider_message_id: String,
    metadata_json: serde_json::Value,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<&EnrichedEvent> for EventRow {
    fn from(enriched: &EnrichedEvent) -> Self {
        Self {
            event_id: enriched.event.id.clone(),
            event_type: enriched.event.event_type.as_str().to_owned(),
            batch_id: enriched.batch_id,
            recipient_id: enriched.recipient_id,
            user_id: enriched.user_id,
            email: enriched.event.provider_message_id.clone(),
            provider_message_id: enriched.event.provider_message_id.clone(),
            metadata_json: enriched.event.metadata.clone(),
            error_message: None,
            created_at: enriched.event.timestamp,
        }
    }
}
