//! Shared `clap::Parser`-derived CLI flags, flattened into each binary's own
//! `Arguments` struct, mirroring the teacher's `crates/autopilot/src/
//! arguments.rs` split between `shared::arguments::Arguments` (flattened
//! common flags) and binary-specific fields.

use {
    crate::deserialize_env::parse_env_indirected,
    std::{net::SocketAddr, num::NonZeroU32, time::Duration},
};

/// Selects plain, human-readable line output or structured JSON lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub enum LogFormat {
    // Variants documented below; Debug derive backs the Display impl of
    // `CommonArguments` so this enum needs no manual formatting.
    Pretty,
    Json,
}

impl LogFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, LogFormat::Json)
    }
}

#[derive(clap::Parser)]
pub struct CommonArguments {
    /// Url of the Postgres write database. Supports reading from an
    /// environment variable by prefixing the value with `%`, e.g.
    /// `%DB_WRITE_URL` reads the `DB_WRITE_URL` environment variable.
    #[clap(
        long,
        env,
        default_value = "postgresql://",
        value_parser = parse_env_indirected,
    )]
    pub db_write_url: String,

    /// Url of a Postgres read replica. Falls back to `db_write_url` if unset.
    #[clap(long, env, value_parser = parse_env_indirected)]
    pub db_read_url: Option<String>,

    /// Maximum number of connections in the Postgres connection pool.
    #[clap(long, env, default_value = "10")]
    pub db_max_connections: NonZeroU32,

    /// Url of the Redis instance backing the hot-state store.
    #[clap(long, env, default_value = "redis://127.0.0.1:6379", value_parser = parse_env_indirected)]
    pub redis_url: String,

    /// Url of the NATS server backing the message bus.
    #[clap(long, env, default_value = "nats://127.0.0.1:4222", value_parser = parse_env_indirected)]
    pub nats_url: String,

    /// Address the Prometheus `/metrics` and `/health` endpoints bind to.
    #[clap(long, env, default_value = "0.0.0.0:9090")]
    pub metrics_address: SocketAddr,

    /// `tracing_subscriber::EnvFilter` directive string.
    #[clap(long, env, default_value = "info")]
    pub log_filter: String,

    #[clap(long, env, default_value = "pretty", value_enum)]
    pub log_format: LogFormat,

    /// How long to wait for in-flight work to drain on shutdown before
    /// forcing an exit (spec §5: bounded drain wait ~15 s).
    #[clap(long, env, default_value = "15s", value_parser = humantime::parse_duration)]
    pub shutdown_drain_timeout: Duration,
}

impl std::fmt::Display for CommonArguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "db_write_url: SECRET")?;
        writeln!(f, "db_read_url: {}", self.db_read_url.as_deref().map_or("unset", |_| "SECRET"))?;
        writeln!(f, "db_max_connections: {}", self.db_max_connections)?;
        writeln!(f, "redis_url: SECRET")?;
        writeln!(f, "nats_url: SECRET")?;
        writeln!(f, "metrics_address: {}", self.metrics_address)?;
        writeln!(f, "log_filter: {}", self.log_filter)?;
        writeln!(f, "log_format: {:?}", self.log_format)?;
        writeln!(f, "shutdown_drain_timeout: {:?}", self.shutdown_drain_timeout)
    }
}
