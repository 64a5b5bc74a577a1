use {clap::Parser, configs::CommonArguments, std::net::SocketAddr, std::time::Duration};

#[derive(Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub common: CommonArguments,

    /// Address the webhook intake HTTP server binds to.
    #[clap(long, env, default_value = "0.0.0.0:8080")]
    pub intake_address: SocketAddr,

    /// Durable consumer name for `webhook.*.*`. Fixed so restarts resume the
    /// same durable rather than creating a new one.
    #[clap(long, env, default_value = "webhook-event-consumer")]
    pub consumer_name: String,

    /// Max events pulled per fetch (spec §4.7: "batches of <= 100").
    #[clap(long, env, default_value = "100")]
    pub fetch_batch_size: usize,

    /// Flush the accumulated event buffer at least this often even if it
    /// never reaches `fetch_batch_size`.
    #[clap(long, env, default_value = "1s", value_parser = humantime::parse_duration)]
    pub flush_interval: Duration,

    /// TTL of the in-process dedup LRU (dedup layer 2).
    #[clap(long, env, default_value = "5m", value_parser = humantime::parse_duration)]
    pub dedup_ttl: Duration,

    /// Capacity of the in-process dedup LRU.
    #[clap(long, env, default_value = "100000")]
    pub dedup_capacity: usize,

    /// How often the custom-module webhook-secret cache refreshes from R.
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub secret_cache_refresh_interval: Duration,

    /// Resend webhook signing secret. Signature check is skipped if unset.
    #[clap(long, env)]
    pub resend_webhook_secret: Option<String>,

    /// Telnyx webhook signing secret. Signature check is skipped if unset.
    #[clap(long, env)]
    pub telnyx_webhook_secret: Option<String>,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.common)?;
        writeln!(f, "intake_address: {}", self.intake_address)?;
        writeln!(f, "consumer_name: {}", self.consumer_name)?;
        writeln!(f, "fetch_batch_size: {}", self.fetch_batch_size)?;
        writeln!(f, "flush_interval: {:?}", self.flush_interval)?;
        writeln!(f, "dedup_ttl: {:?}", self.dedup_ttl)?;
        writeln!(f, "dedup_capacity: {}", self.dedup_capacity)?;
        writeln!(f, "secret_cache_refresh_interval: {:?}", self.secret_cache_refresh_interval)?;
        writeln!(f, "resend_webhook_secret: {}", self.resend_webhook_secret.is_some())?;
        writeln!(f, "telnyx_webhook_secret: {}", self.telnyx_webhook_secret.is_some())
    }
}
