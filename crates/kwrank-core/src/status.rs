//! Lifecycle states for batches and batch items.
//!
//! Both share the same four values but are kept as distinct types so a
//! batch status can never be written into an item column by accident.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl BatchStatus {
    pub const ALL: [BatchStatus; 4] = [
        BatchStatus::Pending,
        BatchStatus::InProgress,
        BatchStatus::Completed,
        BatchStatus::Failed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::InProgress => "in_progress",
            BatchStatus::Completed => "completed",
            BatchStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, BatchStatus::Completed | BatchStatus::Failed)
    }

    /// Terminal status for a batch once processing has drained its queue.
    ///
    /// A batch fails only when nothing completed and something failed; any
    /// success, even mixed with failures, yields `Completed`.
    #[must_use]
    pub fn settle(completed: i64, failed: i64) -> Self {
        if completed == 0 && failed > 0 {
            BatchStatus::Failed
        } else {
            BatchStatus::Completed
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BatchStatus::Pending),
            "in_progress" => Ok(BatchStatus::InProgress),
            "completed" => Ok(BatchStatus::Completed),
            "failed" => Ok(BatchStatus::Failed),
            other => Err(CoreError::InvalidBatchStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for BatchStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ItemStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::InProgress => "in_progress",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }

    /// Single-character marker used in CLI tables.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            ItemStatus::Pending => '\u{22ef}',
            ItemStatus::InProgress => '\u{25b6}',
            ItemStatus::Completed => '\u{2713}',
            ItemStatus::Failed => '\u{2717}',
        }
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ItemStatus::Pending),
            "in_progress" => Ok(ItemStatus::InProgress),
            "completed" => Ok(ItemStatus::Completed),
            "failed" => Ok(ItemStatus::Failed),
            other => Err(CoreError::InvalidItemStatus(other.to_string())),
        }
    }
}

impl TryFrom<String> for ItemStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_status_round_trips_through_str() {
        for status in BatchStatus::ALL {
            assert_eq!(status.as_str().parse::<BatchStatus>().unwrap(), status);
        }
    }

    #[test]
    fn batch_status_rejects_unknown_value() {
        let err = "running".parse::<BatchStatus>().unwrap_err();
        assert!(matches!(err, CoreError::InvalidBatchStatus(ref s) if s == "running"));
    }

    #[test]
    fn item_status_rejects_unknown_value() {
        assert!(ItemStatus::try_from("done".to_string()).is_err());
    }

    #[test]
    fn settle_mixed_outcome_is_completed() {
        assert_eq!(BatchStatus::settle(2, 1), BatchStatus::Completed);
    }

    #[test]
    fn settle_all_failed_is_failed() {
        assert_eq!(BatchStatus::settle(0, 2), BatchStatus::Failed);
    }

    #[test]
    fn settle_empty_is_completed() {
        assert_eq!(BatchStatus::settle(0, 0), BatchStatus::Completed);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&BatchStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }

    #[test]
    fn terminal_states() {
        assert!(ItemStatus::Completed.is_terminal());
        assert!(ItemStatus::Failed.is_terminal());
        assert!(!ItemStatus::InProgress.is_terminal());
        assert!(!BatchStatus::Pending.is_terminal());
    }
}
