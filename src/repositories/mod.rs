// src/repositories/mod.rs
//
// Repository layer
//
// CRITICAL RULES:
// - Repositories are DUMB data mappers
// - NO business logic
// - NO invariant enforcement
// - NO event emission
// - NO cross-repository calls
// - Explicit SQL only
//
// Writes that must share a caller-owned transaction are free functions over
// `&Connection`; pool-backed traits cover standalone reads and writes.

pub mod crawl_record_repository;
pub mod news_item_repository;
pub mod platform_repository;
pub mod push_record_repository;
pub mod rank_history_repository;

pub use crawl_record_repository::{CrawlRecordRepository, SqliteCrawlRecordRepository};
pub use news_item_repository::{ItemFilter, NewsItemRepository, SqliteNewsItemRepository};
pub use platform_repository::{PlatformRepository, SqlitePlatformRepository};
pub use push_record_repository::{PushRecordRepository, SqlitePushRecordRepository};
pub use rank_history_repository::{RankHistoryRepository, SqliteRankHistoryRepository};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

use crate::domain::crawl_time_from_timestamp;

/// Parse an RFC 3339 TEXT column
pub(crate) fn timestamp_column(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a unix-seconds INTEGER crawl time column
pub(crate) fn crawl_time_column(idx: usize, secs: i64) -> rusqlite::Result<DateTime<Utc>> {
    crawl_time_from_timestamp(secs).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, secs))
}

/// Parse a TEXT enum column through its `FromStr`
pub(crate) fn enum_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
