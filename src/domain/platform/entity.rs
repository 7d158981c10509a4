use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::DomainError;

/// A source platform that hotspot lists are scraped from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Stable key, never changes once created
    pub id: String,

    /// Display name
    pub name: String,

    pub kind: PlatformKind,

    /// Platforms are deactivated, never deleted
    pub is_active: bool,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    Forum,
    News,
}

impl Platform {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PlatformKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            is_active: true,
            updated_at: Utc::now(),
        }
    }

    /// Placeholder created the first time an unknown platform shows up in a crawl.
    /// Name and kind can be corrected later through the registry.
    pub fn discovered(id: &str) -> Self {
        Self::new(id, id, PlatformKind::News)
    }

    /// Update the mutable fields. The id never changes.
    pub fn update(&mut self, name: Option<String>, kind: Option<PlatformKind>) {
        if let Some(n) = name {
            self.name = n;
        }
        if let Some(k) = kind {
            self.kind = k;
        }
        self.updated_at = Utc::now();
    }

    pub fn set_active(&mut self, active: bool) {
        self.is_active = active;
        self.updated_at = Utc::now();
    }
}

impl std::fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlatformKind::Forum => write!(f, "forum"),
            PlatformKind::News => write!(f, "news"),
        }
    }
}

impl FromStr for PlatformKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forum" => Ok(PlatformKind::Forum),
            "news" => Ok(PlatformKind::News),
            other => Err(DomainError::InvariantViolation(format!(
                "Unknown platform kind '{}'",
                other
            ))),
        }
    }
}
