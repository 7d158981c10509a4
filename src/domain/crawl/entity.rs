use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// One crawl cycle, identified by its logical time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlRecord {
    pub id: i64,

    /// Logical time of the cycle (unique, whole seconds)
    pub crawl_time: DateTime<Utc>,

    /// Set once by `finalize`
    pub total_items: Option<u32>,

    pub created_at: DateTime<Utc>,
}

impl CrawlRecord {
    pub fn is_finalized(&self) -> bool {
        self.total_items.is_some()
    }
}

/// Fetch outcome of one platform within one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSourceStatus {
    pub crawl_record_id: i64,
    pub platform_id: String,
    pub status: SourceStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Success,
    Failed,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Success => "success",
            SourceStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(SourceStatus::Success),
            "failed" => Ok(SourceStatus::Failed),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown source status '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [SourceStatus::Success, SourceStatus::Failed] {
            assert_eq!(status.as_str().parse::<SourceStatus>().unwrap(), status);
        }
        assert!("partial".parse::<SourceStatus>().is_err());
    }
}
