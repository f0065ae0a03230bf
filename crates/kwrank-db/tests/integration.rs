//! Offline unit tests for kwrank-db pool configuration and row types.
//! These tests do not require a database connection.

use chrono::Utc;
use kwrank_core::{AppConfig, BatchStatus, ItemStatus};
use kwrank_db::{BatchRow, ItemCounts, ItemResolution, PoolConfig};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        log_level: "info".to_string(),
        db_max_connections: 42,
        db_acquire_timeout_secs: 9,
        db_busy_timeout_secs: 3,
        country_filter: Some("United States".to_string()),
        analyzer_command: vec!["appstore".to_string()],
        analyzer_timeout_secs: 60,
        analyzer_storefront: None,
        rate_limit: std::time::Duration::from_secs(2),
        settle_delay_ms: 500,
        lease_secs: 300,
    }
}

fn batch_row(total: i64, completed: i64, failed: i64) -> BatchRow {
    BatchRow {
        id: 1,
        report_id: 1,
        status: BatchStatus::InProgress,
        total_items: total,
        completed_items: completed,
        failed_items: failed,
        notes: None,
        created_at: Utc::now(),
        started_at: None,
        completed_at: None,
        duration_seconds: None,
        claimed_by: None,
        claim_expires_at: None,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
    assert_eq!(pool_config.busy_timeout_secs, 3);
}

#[test]
fn remaining_items_excludes_terminal_counts() {
    assert_eq!(batch_row(10, 4, 2).remaining_items(), 4);
    assert_eq!(batch_row(3, 3, 0).remaining_items(), 0);
}

#[test]
fn claim_is_live_only_before_expiry() {
    let now = Utc::now();
    let mut row = batch_row(1, 0, 0);
    assert!(!row.is_claimed_at(now));

    row.claimed_by = Some("worker-a".to_string());
    row.claim_expires_at = Some(now + chrono::Duration::seconds(30));
    assert!(row.is_claimed_at(now));

    row.claim_expires_at = Some(now - chrono::Duration::seconds(1));
    assert!(!row.is_claimed_at(now));
}

#[test]
fn resolution_maps_to_terminal_item_status() {
    let done = ItemResolution::Completed {
        search_id: Some("s-1".to_string()),
        note: None,
    };
    let failed = ItemResolution::Failed {
        error: "exit code 2".to_string(),
    };
    assert_eq!(done.status(), ItemStatus::Completed);
    assert_eq!(failed.status(), ItemStatus::Failed);
}

#[test]
fn item_counts_total_sums_every_status() {
    let counts = ItemCounts {
        pending: 1,
        in_progress: 2,
        completed: 3,
        failed: 4,
    };
    assert_eq!(counts.total(), 10);
}
