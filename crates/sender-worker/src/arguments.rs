use {clap::Parser, configs::CommonArguments, std::time::Duration};

#[derive(Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub common: CommonArguments,

    /// Stable identity for this process in the leader lock (defaults to a
    /// random id, which is fine — only one instance needs to win).
    #[clap(long, env, default_value_t = uuid::Uuid::new_v4().to_string())]
    pub worker_id: String,

    /// How often this process renews/attempts the leader lock.
    #[clap(long, env, default_value = "5s", value_parser = humantime::parse_duration)]
    pub leader_lock_ttl: Duration,

    /// Messages fetched per consumer poll, per user.
    #[clap(long, env, default_value = "10")]
    pub fetch_batch_size: usize,

    /// Interval between sync-reconciler ticks (§4.6).
    #[clap(long, env, default_value = "2s", value_parser = humantime::parse_duration)]
    pub sync_interval: Duration,

    /// Interval between scheduled-to-queued ticks (§4.8).
    #[clap(long, env, default_value = "30s", value_parser = humantime::parse_duration)]
    pub scheduler_interval: Duration,

    /// Interval between queued-to-bus ticks (§4.8).
    #[clap(long, env, default_value = "5s", value_parser = humantime::parse_duration)]
    pub queued_to_bus_interval: Duration,

    /// Interval between stuck-batch scans (§4.6).
    #[clap(long, env, default_value = "5m", value_parser = humantime::parse_duration)]
    pub stuck_scan_interval: Duration,

    /// A `processing` batch untouched for longer than this is considered
    /// stuck and is reconciled by the stuck-batch scanner.
    #[clap(long, env, default_value = "10m", value_parser = humantime::parse_duration)]
    pub stuck_after: Duration,

    /// How often to re-scan for users with a `processing` batch that don't
    /// yet have a durable chunk consumer running.
    #[clap(long, env, default_value = "10s", value_parser = humantime::parse_duration)]
    pub consumer_discovery_interval: Duration,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.common)?;
        writeln!(f, "worker_id: {}", self.worker_id)?;
        writeln!(f, "leader_lock_ttl: {:?}", self.leader_lock_ttl)?;
        writeln!(f, "fetch_batch_size: {}", self.fetch_batch_size)?;
        writeln!(f, "sync_interval: {:?}", self.sync_interval)?;
        writeln!(f, "scheduler_interval: {:?}", self.scheduler_interval)?;
        writeln!(f, "queued_to_bus_interval: {:?}", self.queued_to_bus_interval)?;
        writeln!(f, "stuck_scan_interval: {:?}", self.stuck_scan_interval)?;
        writeln!(f, "stuck_after: {:?}", self.stuck_after)?;
        writeln!(f, "consumer_discovery_interval: {:?}", self.consumer_discovery_interval)
    }
}
