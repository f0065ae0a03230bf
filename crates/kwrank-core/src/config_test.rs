use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with the database URL set explicitly.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("DATABASE_URL", "sqlite://./test.db");
    m
}

#[test]
fn build_app_config_fails_without_database_url_or_home() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "DATABASE_URL"),
        "expected MissingEnvVar(DATABASE_URL), got: {result:?}"
    );
}

#[test]
fn database_url_defaults_to_shared_appstore_file() {
    let mut map: HashMap<&str, &str> = HashMap::new();
    map.insert("HOME", "/home/analyst/");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.database_url,
        "sqlite:///home/analyst/.appstore/analytics.db"
    );
}

#[test]
fn build_app_config_defaults() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.database_url, "sqlite://./test.db");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.db_max_connections, 5);
    assert_eq!(cfg.db_acquire_timeout_secs, 10);
    assert_eq!(cfg.db_busy_timeout_secs, 5);
    assert_eq!(cfg.country_filter.as_deref(), Some("United States"));
    assert_eq!(cfg.analyzer_command, vec!["appstore".to_string()]);
    assert_eq!(cfg.analyzer_timeout_secs, 60);
    assert!(cfg.analyzer_storefront.is_none());
    assert_eq!(cfg.rate_limit, Duration::from_secs(2));
    assert_eq!(cfg.settle_delay_ms, 500);
    assert_eq!(cfg.lease_secs, 300);
}

#[test]
fn empty_country_filter_disables_filtering() {
    let mut map = full_env();
    map.insert("KWRANK_COUNTRY_FILTER", "  ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.country_filter.is_none());
}

#[test]
fn analyzer_command_splits_leading_arguments() {
    let mut map = full_env();
    map.insert("KWRANK_ANALYZER_CMD", "/opt/appstore/bin/appstore --quiet");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(
        cfg.analyzer_command,
        vec![
            "/opt/appstore/bin/appstore".to_string(),
            "--quiet".to_string()
        ]
    );
}

#[test]
fn blank_analyzer_command_is_rejected() {
    let mut map = full_env();
    map.insert("KWRANK_ANALYZER_CMD", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_ANALYZER_CMD"),
        "expected InvalidEnvVar(KWRANK_ANALYZER_CMD), got: {result:?}"
    );
}

#[test]
fn zero_analyzer_timeout_is_rejected() {
    let mut map = full_env();
    map.insert("KWRANK_ANALYZER_TIMEOUT_SECS", "0");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_ANALYZER_TIMEOUT_SECS"),
        "expected InvalidEnvVar(KWRANK_ANALYZER_TIMEOUT_SECS), got: {result:?}"
    );
}

#[test]
fn rate_limit_override_accepts_fractions() {
    let mut map = full_env();
    map.insert("KWRANK_RATE_LIMIT_SECS", "0.25");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.rate_limit, Duration::from_millis(250));
}

#[test]
fn negative_rate_limit_is_rejected() {
    let mut map = full_env();
    map.insert("KWRANK_RATE_LIMIT_SECS", "-1");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_RATE_LIMIT_SECS"),
        "expected InvalidEnvVar(KWRANK_RATE_LIMIT_SECS), got: {result:?}"
    );
}

#[test]
fn parse_rate_limit_rejects_non_finite() {
    assert!(parse_rate_limit("inf").is_err());
    assert!(parse_rate_limit("NaN").is_err());
    assert!(parse_rate_limit("abc").is_err());
    assert_eq!(parse_rate_limit(" 1.5 ").unwrap(), Duration::from_millis(1500));
}

#[test]
fn rate_limit_too_large_for_a_duration_is_rejected() {
    assert!(parse_rate_limit("1e30").is_err());

    let mut map = full_env();
    map.insert("KWRANK_RATE_LIMIT_SECS", "1e30");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_RATE_LIMIT_SECS"),
        "expected InvalidEnvVar(KWRANK_RATE_LIMIT_SECS), got: {result:?}"
    );
}

#[test]
fn invalid_max_connections_is_rejected() {
    let mut map = full_env();
    map.insert("KWRANK_DB_MAX_CONNECTIONS", "many");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "KWRANK_DB_MAX_CONNECTIONS"),
        "expected InvalidEnvVar(KWRANK_DB_MAX_CONNECTIONS), got: {result:?}"
    );
}

#[test]
fn storefront_override_is_trimmed() {
    let mut map = full_env();
    map.insert("KWRANK_ANALYZER_STOREFRONT", " gb ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.analyzer_storefront.as_deref(), Some("gb"));
}

#[test]
fn debug_output_redacts_database_url() {
    let map = full_env();
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("test.db"));
    assert!(debug.contains("[redacted]"));
}
