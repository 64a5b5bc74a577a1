use {
    crate::Result,
    model::{SendConfig, SendConfigId, UserId},
    sqlx::{types::Json, PgConnection},
};

#[derive(sqlx::FromRow)]
struct SendConfigRow {
    id: SendConfigId,
    user_id: UserId,
    name: String,
    config: Json<model::SendConfigPayload>,
    rate_limit: Option<Json<model::RateLimit>>,
    is_default: bool,
    is_active: bool,
}

impl From<SendConfigRow> for SendConfig {
    fn from(row: SendConfigRow) -> Self {
        SendConfig {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            config: row.config.0,
            rate_limit: row.rate_limit.map(|Json(inner)| inner),
            is_default: row.is_default,
            is_active: row.is_active,
        }
    }
}

const SELECT: &str = r#"
SELECT id, user_id, name, config, rate_limit, is_default, is_active
FROM send_configs
WHERE id = $1
"#;

/// Loads a send-config by id (Batch Processor step 1, sender-worker chunk
/// snapshot building). Returns `Ok(None)` if the row was deleted after the
/// batch was created — callers treat that as a permanent batch failure.
pub async fn fetch_by_id(
    ex: &mut PgConnection,
    id: SendConfigId,
) -> Result<Option<SendConfig>> {
    let row: Option<SendConfigRow> = sqlx::query_as(SELECT).bind(id).fetch_optional(ex).await?;
    Ok(row.map(Into::into))
}

/// Loads every active webhook-module send-config (webhook-gateway's secret
/// cache refresh, §4.7 step 1's `custom/{moduleId}` lookup — `moduleId` is a
/// send-config id whose config carries the module's `webhookSecret`).
pub async fn select_webhook_configs(ex: &mut PgConnection) -> Result<Vec<SendConfig>> {
    let query = format!("{SELECT} WHERE is_active AND config->>'module' = 'webhook'");
    let rows: Vec<SendConfigRow> = sqlx::query_as(&query).fetch_all(ex).await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use {super::*, sqlx::Connection};

    #[tokio::test]
    #[ignore]
    async fn postgres_roundtrip() {
        let mut db = sqlx::PgConnection::connect("postgresql://").await.unwrap();
        let mut db = db.begin().await.unwrap();
        crate::clear_DANGER_(&mut db).await.unwrap();
        let found = fetch_by_id(&mut db, SendConfigId::new()).await.unwrap();
        assert!(found.is_none());
    }
}
