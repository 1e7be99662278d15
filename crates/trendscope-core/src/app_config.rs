use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub scenarios_path: PathBuf,
    pub trends_base_url: String,
    pub trends_timeout_secs: u64,
    pub trends_max_retries: u32,
    pub trends_backoff_base_ms: u64,
    /// Trends analysis window, in the source's timeframe syntax.
    pub trends_timeframe: String,
    /// Deadline for one seed fetch; an elapsed fetch counts as a failed seed.
    pub seed_fetch_timeout_secs: u64,
    /// Snapshots older than this trigger a re-aggregation.
    pub snapshot_max_age_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &"[redacted]")
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("scenarios_path", &self.scenarios_path)
            .field("trends_base_url", &self.trends_base_url)
            .field("trends_timeout_secs", &self.trends_timeout_secs)
            .field("trends_max_retries", &self.trends_max_retries)
            .field("trends_backoff_base_ms", &self.trends_backoff_base_ms)
            .field("trends_timeframe", &self.trends_timeframe)
            .field("seed_fetch_timeout_secs", &self.seed_fetch_timeout_secs)
            .field("snapshot_max_age_secs", &self.snapshot_max_age_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
