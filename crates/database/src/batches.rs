use {
    crate::Result,
    chrono::{DateTime, Utc},
    model::{Batch, BatchId, BatchStatus, SendConfigId, UserId},
    sqlx::{types::Json, PgConnection},
};

#[derive(sqlx::FromRow)]
struct BatchRow {
    id: BatchId,
    user_id: UserId,
    send_config_id: Option<SendConfigId>,
    name: String,
    status: BatchStatus,
    payload: Json<model::BatchPayload>,
    total_recipients: i64,
    sent_count: i64,
    failed_count: i64,
    delivered_count: i64,
    bounced_count: i64,
    scheduled_at: Option<DateTime<Utc>>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    dry_run: bool,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            user_id: row.user_id,
            send_config_id: row.send_config_id,
            name: row.name,
            status: row.status,
            payload: row.payload.0,
            total_recipients: row.total_recipients,
            sent_count: row.sent_count,
            failed_count: row.failed_count,
            delivered_count: row.delivered_count,
            bounced_count: row.bounced_count,
            scheduled_at: row.scheduled_at,
            started_at: row.started_at,
            completed_at: row.completed_at,
            dry_run: row.dry_run,
        }
    }
}

const SELECT: &str = r#"
SELECT id, user_id, send_config_id, name, status, payload, total_recipients,
       sent_count, failed_count, delivered_count, bounced_count,
       scheduled_at, started_at, completed_at, dry_run
FROM batches
"#;

pub async fn fetch_by_id(ex: &mut PgConnection, id: BatchId) -> Result<Option<Batch>> {
    let query = format!("{SELECT} WHERE id = $1");
    let row: Option<BatchRow> = sqlx::query_as(&query).bind(id).fetch_optional(ex).await?;
    Ok(row.map(Into::into))
}

/// Batch Processor step 4: claim a queued batch. Idempotent — a retry of an
/// already-claimed batch is a no-op, which matters because step 4 onward is
/// not guarded by the idempotency sweep that protects per-recipient sends.
pub async fn mark_processing(ex: &mut PgConnection, id: BatchId) -> Result<bool> {
    const QUERY: &str = r#"
UPDATE batches
SET status = 'processing', started_at = now()
WHERE id = $1 AND status IN ('queued', 'processing')
"#;
    let result = sqlx::query(QUERY).bind(id).execute(ex).await?;
    Ok(result.rows_affected() > 0)
}

/// Reconciler step 5 / stuck-batch recovery: finalize a batch once every
/// recipient has reached a terminal status.
pub async fn mark_completed(ex: &mut PgConnection, id: BatchId) -> Result<bool> {
    const QUERY: &str = r#"
UPDATE batches
SET status = 'completed', completed_at = now()
WHERE id = $1 AND status != 'completed'
"#;
    let result = sqlx::query(QUERY).bind(id).execute(ex).await?;
    Ok(result.rows_affected() > 0)
}

/// Stuck-batch recovery: reset a batch that made no progress back to
/// `queued` so the queued-to-bus adapter re-enqueues it.
pub async fn reset_to_queued(ex: &mut PgConnection, id: BatchId) -> Result<bool> {
    const QUERY: &str = r#"
UPDATE batches
SET status = 'queued', started_at = NULL
WHERE id = $1 AND status = 'processing'
"#;
    let result = sqlx::query(QUERY).bind(id).execute(ex).await?;
    Ok(result.rows_affected() > 0)
}

/// Reconciler step 4: mirror hot-state counters into R.
pub async fn update_counters(
    ex: &mut PgConnection,
    id: BatchId,
    sent_count: i64,
    failed_count: i64,
) -> Result<()> {
    const QUERY: &str = r#"
UPDATE batches
SET sent_count = $2, failed_count = $3
WHERE id = $1
"#;
    sqlx::query(QUERY)
        .bind(id)
        .bind(sent_count)
        .bind(failed_count)
        .execute(ex)
        .await?;
    Ok(())
}

/// Webhook event consumer: increments the delivered/bounced counters that
/// are not tracked by the sender-worker's hot-state counters.
pub async fn increment_delivered(ex: &mut PgConnection, id: BatchId, by: i64) -> Result<()> {
    const QUERY: &str = "UPDATE batches SET delivered_count = delivered_count + $2 WHERE id = $1";
    sqlx::query(QUERY).bind(id).bind(by).execute(ex).await?;
    Ok(())
}

pub async fn increment_bounced(ex: &mut PgConnection, id: BatchId, by: i64) -> Result<()> {
    const QUERY: &str = "UPDATE batches SET bounced_count = bounced_count + $2 WHERE id = $1";
    sqlx::query(QUERY).bind(id).bind(by).execute(ex).await?;
    Ok(())
}

/// Leader scheduler: batches ready to move from `scheduled` to `queued`.
pub async fn select_scheduled_ready(
    ex: &mut PgConnection,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Batch>> {
    let query = format!(
        "{SELECT} WHERE status = 'scheduled' AND scheduled_at <= $1 ORDER BY scheduled_at LIMIT $2"
    );
    let rows: Vec<BatchRow> = sqlx::query_as(&query)
        .bind(now)
        .bind(limit)
        .fetch_all(ex)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

pub async fn set_queued(ex: &mut PgConnection, id: BatchId) -> Result<bool> {
    const QUERY: &str = "UPDATE batches SET status = 'queued' WHERE id = $1 AND status = 'scheduled'";
    let result = sqlx::query(QUERY).bind(id).execute(ex).await?;
    Ok(result.rows_affected() > 0)
}

/// Leader queued-to-bus adapter: batches claimed by nobody yet.
pub async fn select_queued(ex: &mut PgConnection, limit: i64) -> Result<Vec<Batch>> {
    let query = format!("{SELECT} WHERE status = 'queued' ORDER BY id LIMIT $1");
    let rows: Vec<BatchRow> = sqlx::query_as(&query).bind(limit).fetch_all(ex).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Stuck-batch scanner: batches that have been `processing` longer than
/// `older_than`.
pub async fn select_stuck_processing(
    ex: &mut PgConnection,
    cutoff: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<Batch>> {
    let query =
        format!("{SELECT} WHERE status = 'processing' AND started_at < $1 ORDER BY started_at LIMIT $2");
    let rows: Vec<BatchRow> = sqlx::query_as(&query)
        .bind(cutoff)
        .bind(limit)
        .fetch_all(ex)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Sender worker startup (§4.3): users with a batch currently `processing`
/// need a durable chunk consumer even if no new chunk has arrived since
/// this worker booted.
pub async fn select_active_user_ids(ex: &mut PgConnection) -> Result<Vec<UserId>> {
    const QUERY: &str = "SELECT DISTINCT user_id FROM batches WHERE status = 'processing'";
    let ids: Vec<(UserId,)> = sqlx::query_as(QUERY).fetch_all(ex).await?;
    Ok(ids.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    #[tokio::test]
    #[ignore]
    async fn postgres_mark_processing_is_idempotent() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();

        let id = BatchId::new();
        assert!(!mark_processing(&mut db, id).await.unwrap());
    }
}
