use {clap::Parser, configs::CommonArguments};

#[derive(Parser)]
pub struct Arguments {
    #[clap(flatten)]
    pub common: CommonArguments,

    /// Durable consumer name for `sys.batch.process`. Fixed so restarts
    /// resume the same durable rather than creating a new one.
    #[clap(long, env, default_value = "batch-processor")]
    pub consumer_name: String,

    /// Max messages fetched per pull from the bus.
    #[clap(long, env, default_value = "10")]
    pub fetch_batch_size: usize,
}

impl std::fmt::Display for Arguments {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.common)?;
        writeln!(f, "consumer_name: {}", self.consumer_name)?;
        writeln!(f, "fetch_batch_size: {}", self.fetch_batch_size)
    }
}
