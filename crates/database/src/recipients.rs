use {
    crate::Result,
    chrono::{DateTime, Utc},
    model::{BatchId, Recipient, RecipientId, RecipientStatus},
    serde::Serialize,
    sqlx::{types::Json, PgConnection},
    std::collections::HashMap,
};

#[derive(sqlx::FromRow)]
struct RecipientRow {
    id: RecipientId,
    batch_id: BatchId,
    identifier: String,
    name: Option<String>,
    variables: Json<HashMap<String, serde_json::Value>>,
    status: RecipientStatus,
    provider_message_id: Option<String>,
    error_message: Option<String>,
    sent_at: Option<DateTime<Utc>>,
    delivered_at: Option<DateTime<Utc>>,
    bounced_at: Option<DateTime<Utc>>,
}

impl From<RecipientRow> for Recipient {
    fn from(row: RecipientRow) -> Self {
        Recipient {
            id: row.id,
            batch_id: row.batch_id,
            identifier: row.identifier,
            name: row.name,
            variables: row.variables.0,
            status: row.status,
            provider_message_id: row.provider_message_id,
            error_message: row.error_message,
            sent_at: row.sent_at,
            delivered_at: row.delivered_at,
            bounced_at: row.bounced_at,
        }
    }
}

const SELECT: &str = r#"
SELECT id, batch_id, identifier, name, variables, status, provider_message_id,
       error_message, sent_at, delivered_at, bounced_at
FROM recipients
"#;

/// Batch Processor step 2: IDs only, not full rows — chunking needs nothing
/// else.
pub async fn select_pending_ids(ex: &mut PgConnection, batch_id: BatchId) -> Result<Vec<RecipientId>> {
    const QUERY: &str = "SELECT id FROM recipients WHERE batch_id = $1 AND status = 'pending' ORDER BY id";
    let ids: Vec<(RecipientId,)> = sqlx::query_as(QUERY).bind(batch_id).fetch_all(ex).await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

/// Sender Worker step 2: single `IN` query for the chunk's surviving IDs.
pub async fn fetch_by_ids(
    ex: &mut PgConnection,
    batch_id: BatchId,
    ids: &[RecipientId],
) -> Result<Vec<Recipient>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let query = format!("{SELECT} WHERE batch_id = $1 AND id = ANY($2)");
    let rows: Vec<RecipientRow> = sqlx::query_as(&query)
        .bind(batch_id)
        .bind(ids.iter().map(|id| id.0).collect::<Vec<_>>())
        .fetch_all(ex)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// One row of the reconciler sync's data-driven join payload.
#[derive(Serialize)]
pub struct SyncUpdate {
    pub id: RecipientId,
    pub status: RecipientStatus,
    pub sent_at: Option<DateTime<Utc>>,
    pub provider_message_id: Option<String>,
    pub error_message: Option<String>,
}

/// Reconciler step 2: mirrors a batch of hot-state outcomes into R in a
/// single statement, joining the parameter rather than issuing one
/// round-trip per recipient (spec §4.6: "pass IDs + fields as a single JSON
/// array parameter, join the parameter to the table").
pub async fn bulk_apply_sync(ex: &mut PgConnection, updates: &[SyncUpdate]) -> Result<u64> {
    if updates.is_empty() {
        return Ok(0);
    }
    const QUERY: &str = r#"
UPDATE recipients r
SET status = u.status,
    sent_at = COALESCE(u.sent_at, r.sent_at),
    provider_message_id = COALESCE(u.provider_message_id, r.provider_message_id),
    error_message = u.error_message
FROM jsonb_to_recordset($1::jsonb) AS u(
    id uuid,
    status text,
    sent_at timestamptz,
    provider_message_id text,
    error_message text
)
WHERE r.id = u.id
"#;
    let payload = serde_json::to_value(updates)?;
    let result = sqlx::query(QUERY).bind(payload).execute(ex).await?;
    Ok(result.rows_affected())
}

/// Webhook event consumer: conditional transition to `delivered` (dedup
/// Layer 3 — a duplicate that slipped through the bus and the in-process LRU
/// is still a no-op here).
pub async fn bulk_mark_delivered(
    ex: &mut PgConnection,
    provider_message_ids: &[String],
    at: DateTime<Utc>,
) -> Result<Vec<BatchId>> {
    bulk_mark_terminal(ex, provider_message_ids, RecipientStatus::Delivered, Some(at)).await
}

pub async fn bulk_mark_bounced(
    ex: &mut PgConnection,
    provider_message_ids: &[String],
) -> Result<Vec<BatchId>> {
    bulk_mark_terminal(ex, provider_message_ids, RecipientStatus::Bounced, None).await
}

pub async fn bulk_mark_complained(
    ex: &mut PgConnection,
    provider_message_ids: &[String],
) -> Result<Vec<BatchId>> {
    bulk_mark_terminal(ex, provider_message_ids, RecipientStatus::Complained, None).await
}

async fn bulk_mark_terminal(
    ex: &mut PgConnection,
    provider_message_ids: &[String],
    status: RecipientStatus,
    delivered_at: Option<DateTime<Utc>>,
) -> Result<Vec<BatchId>> {
    if provider_message_ids.is_empty() {
        return Ok(Vec::new());
    }
    const QUERY: &str = r#"
UPDATE recipients
SET status = $2, delivered_at = COALESCE($3, delivered_at)
WHERE provider_message_id = ANY($1) AND status NOT IN ('delivered', 'bounced', 'complained', 'failed')
RETURNING batch_id
"#;
    let rows: Vec<(BatchId,)> = sqlx::query_as(QUERY)
        .bind(provider_message_ids)
        .bind(status)
        .bind(delivered_at)
        .fetch_all(ex)
        .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Stuck-batch recovery: whether every recipient of `batch_id` has reached a
/// terminal status.
pub async fn all_terminal(ex: &mut PgConnection, batch_id: BatchId) -> Result<bool> {
    const QUERY: &str = r#"
SELECT NOT EXISTS(
    SELECT 1 FROM recipients
    WHERE batch_id = $1 AND status NOT IN ('delivered', 'bounced', 'complained', 'failed')
)
"#;
    let (all_terminal,): (bool,) = sqlx::query_as(QUERY).bind(batch_id).fetch_one(ex).await?;
    Ok(all_terminal)
}

/// Stuck-batch recovery: whether any recipient of `batch_id` is still
/// `queued` (i.e. never even reached the sender worker).
pub async fn any_queued(ex: &mut PgConnection, batch_id: BatchId) -> Result<bool> {
    const QUERY: &str = "SELECT EXISTS(SELECT 1 FROM recipients WHERE batch_id = $1 AND status = 'queued')";
    let (any,): (bool,) = sqlx::query_as(QUERY).bind(batch_id).fetch_one(ex).await?;
    Ok(any)
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    #[tokio::test]
    #[ignore]
    async fn postgres_bulk_apply_sync_is_noop_on_empty() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();
        assert_eq!(bulk_apply_sync(&mut db, &[]).await.unwrap(), 0);
    }
}
