use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DomainError, DomainResult};

/// One delivered report (e.g. "daily", "incremental"), logged after the send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushRecord {
    pub id: i64,

    /// UTC calendar day of `pushed_at`
    pub push_date: NaiveDate,

    pub report_type: String,
    pub pushed_at: DateTime<Utc>,
}

impl PushRecord {
    pub fn new(report_type: impl Into<String>, pushed_at: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            push_date: pushed_at.date_naive(),
            report_type: report_type.into(),
            pushed_at,
        }
    }
}

pub fn validate_push_record(record: &PushRecord) -> DomainResult<()> {
    if record.report_type.trim().is_empty() {
        return Err(DomainError::InvariantViolation(
            "Push record needs a report type".to_string(),
        ));
    }
    if record.push_date != record.pushed_at.date_naive() {
        return Err(DomainError::InvariantViolation(format!(
            "Push date {} does not match pushed_at {}",
            record.push_date, record.pushed_at
        )));
    }
    Ok(())
}
