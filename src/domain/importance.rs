// src/domain/importance.rs
//
// Importance labels assigned by the external classifier.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// Closed set of labels the classifier may assign.
///
/// Declaration order is severity order: `Critical` sorts before `High`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    Critical,
    High,
    Medium,
    Low,
}

impl Importance {
    pub const ALL: [Importance; 4] = [
        Importance::Critical,
        Importance::High,
        Importance::Medium,
        Importance::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Critical => "critical",
            Importance::High => "high",
            Importance::Medium => "medium",
            Importance::Low => "low",
        }
    }

    /// 0 for the most severe label. Used as an SQL sort key.
    pub fn severity_rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for Importance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Importance::Critical),
            "high" => Ok(Importance::High),
            "medium" => Ok(Importance::Medium),
            "low" => Ok(Importance::Low),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown importance label '{}'",
                other
            ))),
        }
    }
}
