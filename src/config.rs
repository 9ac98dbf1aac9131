use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Number of concurrent client tasks.
    #[arg(short, long, default_value_t = 8)]
    pub workers: usize,

    /// Image requests issued by each client task.
    #[arg(short, long, default_value_t = 5_000)]
    pub operations: usize,

    /// Number of distinct media ids requested.
    #[arg(short, long, default_value_t = 200)]
    pub keyspace: usize,

    /// Heap limit the cache budgets are derived from, in MiB.
    #[arg(long, default_value_t = 64)]
    pub heap: usize,

    /// Delay between memory pressure signals, in milliseconds.
    #[arg(short, long, default_value_t = 25)]
    pub trim_interval: u64,

    /// Seed for the request generator.
    #[arg(short, long, default_value_t = 0)]
    pub seed: u64,

    /// Record cached variants and answer decoded misses with other sizes.
    #[arg(long)]
    pub variations: bool,

    /// Log bitmaps which enter the cache without being decoded by the pipeline.
    #[arg(long)]
    pub log_external_bitmaps: bool,
}
