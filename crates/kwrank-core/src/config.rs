use std::time::Duration;

use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it with a
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = match lookup("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            let home = lookup("HOME")
                .map_err(|_| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;
            default_database_url(&home)
        }
    };

    let log_level = or_default("KWRANK_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("KWRANK_DB_MAX_CONNECTIONS", "5")?;
    if db_max_connections == 0 {
        return Err(invalid(
            "KWRANK_DB_MAX_CONNECTIONS",
            "must be at least 1".to_string(),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("KWRANK_DB_ACQUIRE_TIMEOUT_SECS", "10")?;
    let db_busy_timeout_secs = parse_u64("KWRANK_DB_BUSY_TIMEOUT_SECS", "5")?;

    let country_filter = non_empty(or_default("KWRANK_COUNTRY_FILTER", "United States"));

    let analyzer_command: Vec<String> = or_default("KWRANK_ANALYZER_CMD", "appstore")
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if analyzer_command.is_empty() {
        return Err(invalid("KWRANK_ANALYZER_CMD", "must name a program".to_string()));
    }
    let analyzer_timeout_secs = parse_u64("KWRANK_ANALYZER_TIMEOUT_SECS", "60")?;
    if analyzer_timeout_secs == 0 {
        return Err(invalid(
            "KWRANK_ANALYZER_TIMEOUT_SECS",
            "must be at least 1".to_string(),
        ));
    }
    let analyzer_storefront = lookup("KWRANK_ANALYZER_STOREFRONT").ok().and_then(non_empty);

    let rate_limit = parse_rate_limit(&or_default("KWRANK_RATE_LIMIT_SECS", "2.0"))
        .map_err(|reason| invalid("KWRANK_RATE_LIMIT_SECS", reason))?;
    let settle_delay_ms = parse_u64("KWRANK_SETTLE_DELAY_MS", "500")?;
    let lease_secs = parse_u64("KWRANK_LEASE_SECS", "300")?;

    Ok(AppConfig {
        database_url,
        log_level,
        db_max_connections,
        db_acquire_timeout_secs,
        db_busy_timeout_secs,
        country_filter,
        analyzer_command,
        analyzer_timeout_secs,
        analyzer_storefront,
        rate_limit,
        settle_delay_ms,
        lease_secs,
    })
}

/// The analysis tool keeps its database under `~/.appstore`; sharing the file
/// is what lets search results be correlated back to batch items.
fn default_database_url(home: &str) -> String {
    format!(
        "sqlite://{}/.appstore/analytics.db",
        home.trim_end_matches('/')
    )
}

/// Parse a rate-limit interval in (fractional) seconds.
///
/// # Errors
///
/// Returns a reason string if the value is not a non-negative number of
/// seconds that fits in a [`Duration`].
pub fn parse_rate_limit(raw: &str) -> Result<Duration, String> {
    let secs = raw.trim().parse::<f64>().map_err(|e| e.to_string())?;
    if secs.is_sign_negative() {
        return Err(format!("'{raw}' is not a non-negative number of seconds"));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| format!("'{raw}': {e}"))
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
