//! Relational store (R): durable truth for users, send-configs, batches and
//! recipients. Grounded in the teacher's `crates/database` +
//! `crates/autopilot/src/database.rs`: a thin `Postgres(PgPool)` wrapper
//! plus free functions taking an executor, so callers choose whether a
//! function participates in a caller's transaction.

pub mod batches;
pub mod error;
pub mod recipients;
pub mod send_configs;

pub use error::{Error, Result};

use sqlx::{Executor, PgPool};

pub type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

/// The names of all tables this crate writes, used by `clear_DANGER_` and
/// the row-count metric.
pub const ALL_TABLES: &[&str] = &["users", "send_configs", "batches", "recipients"];

/// Thin, cheaply-cloneable handle around the Postgres pool, matching the
/// teacher's `Postgres(pub PgPool)` wrapper (`crates/autopilot/src/
/// database.rs`), constructed once per process per §9.
#[derive(Clone)]
pub struct Postgres(pub PgPool);

impl Postgres {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self(pool))
    }
}

/// Deletes all data in the database. Only used by tests.
#[allow(non_snake_case)]
pub async fn clear_DANGER_(ex: &mut PgTransaction<'_>) -> Result<()> {
    for table in ALL_TABLES {
        ex.execute(format!("TRUNCATE {table} CASCADE;").as_str())
            .await?;
    }
    Ok(())
}

#[allow(non_snake_case)]
pub async fn clear_DANGER(pool: &PgPool) -> Result<()> {
    let mut transaction = pool.begin().await?;
    clear_DANGER_(&mut transaction).await?;
    transaction.commit().await?;
    Ok(())
}
