use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub log_level: String,
    pub db_max_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub db_busy_timeout_secs: u64,
    /// Country imported rows must match; `None` imports every country.
    pub country_filter: Option<String>,
    /// Program followed by any leading arguments, e.g. `["appstore"]`.
    pub analyzer_command: Vec<String>,
    pub analyzer_timeout_secs: u64,
    pub analyzer_storefront: Option<String>,
    /// Pause between tool runs.
    pub rate_limit: Duration,
    pub settle_delay_ms: u64,
    pub lease_secs: u64,
}

impl AppConfig {
    #[must_use]
    pub fn analyzer_timeout(&self) -> Duration {
        Duration::from_secs(self.analyzer_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("db_busy_timeout_secs", &self.db_busy_timeout_secs)
            .field("country_filter", &self.country_filter)
            .field("analyzer_command", &self.analyzer_command)
            .field("analyzer_timeout_secs", &self.analyzer_timeout_secs)
            .field("analyzer_storefront", &self.analyzer_storefront)
            .field("rate_limit", &self.rate_limit)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("lease_secs", &self.lease_secs)
            .finish()
    }
}
