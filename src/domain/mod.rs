// src/domain/mod.rs
//
// Domain Root - The Single Source of Truth for Domain API
//
// This file MUST declare all domain modules and re-export their public API.
// All other modules import from `crate::domain::*`

// ============================================================================
// MODULE DECLARATIONS
// ============================================================================

pub mod crawl;
pub mod importance;
pub mod news_item;
pub mod normalization;
pub mod observation;
pub mod platform;
pub mod push_record;
pub mod rank_history;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Platform Domain
pub use platform::{validate_platform, Platform, PlatformKind};

// News Item Domain
pub use news_item::{validate_news_item, MergeEffect, NewsItem, PushState, PushTransition};

// Observations
pub use observation::{truncate_to_second, validate_observation, Observation, RawItem};

// Classification
pub use importance::Importance;

// Crawl Cycles
pub use crawl::{CrawlRecord, CrawlSourceStatus, SourceStatus};

// Push Log
pub use push_record::{validate_push_record, PushRecord};

// Rank History (append-only)
pub use rank_history::{RankHistoryEntry, RankTrend, TrendDirection, TrendWindow};

// Title Normalization
pub use normalization::{TitleNormalizer, DEFAULT_STRIP_PATTERN};

// ============================================================================
// DOMAIN ERROR TYPES
// ============================================================================

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Domain-level errors
/// These represent violations of business rules and invariants
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Entity not found: {0}")]
    NotFound(String),
}

/// Domain result type
pub type DomainResult<T> = Result<T, DomainError>;

/// Crawl times are persisted as unix seconds.
pub fn crawl_time_from_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}
