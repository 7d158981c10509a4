// src/repositories/crawl_record_repository.rs
//
// Crawl record and per-platform status persistence

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

use crate::db::ConnectionPool;
use crate::domain::{CrawlRecord, CrawlSourceStatus, SourceStatus};
use crate::error::AppResult;
use crate::repositories::{crawl_time_column, enum_column, timestamp_column};

#[cfg_attr(test, mockall::automock)]
pub trait CrawlRecordRepository: Send + Sync {
    /// Plain insert: a second record for the same crawl_time is a constraint violation
    fn insert(&self, crawl_time: DateTime<Utc>) -> AppResult<CrawlRecord>;
    fn get_by_id(&self, id: i64) -> AppResult<Option<CrawlRecord>>;
    fn get_by_time(&self, crawl_time: DateTime<Utc>) -> AppResult<Option<CrawlRecord>>;
    fn latest(&self) -> AppResult<Option<CrawlRecord>>;
    /// Crawl times at or after `since`, ascending
    fn list_times_since(&self, since: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>>;
    /// Records with from <= crawl_time < to
    fn count_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<u32>;
    /// Sets total_items only if still unset. Returns false when nothing changed.
    fn set_total_items(&self, id: i64, total_items: u32) -> AppResult<bool>;
    fn insert_source_status(&self, status: &CrawlSourceStatus) -> AppResult<()>;
    fn list_source_statuses(&self, crawl_record_id: i64) -> AppResult<Vec<CrawlSourceStatus>>;
}

pub struct SqliteCrawlRecordRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteCrawlRecordRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &Row) -> Result<CrawlRecord, rusqlite::Error> {
        let created_at_str: String = row.get(3)?;
        Ok(CrawlRecord {
            id: row.get(0)?,
            crawl_time: crawl_time_column(1, row.get(1)?)?,
            total_items: row.get(2)?,
            created_at: timestamp_column(3, &created_at_str)?,
        })
    }

    fn row_to_status(row: &Row) -> Result<CrawlSourceStatus, rusqlite::Error> {
        let status_str: String = row.get(2)?;
        Ok(CrawlSourceStatus {
            crawl_record_id: row.get(0)?,
            platform_id: row.get(1)?,
            status: enum_column::<SourceStatus>(2, &status_str)?,
        })
    }
}

impl CrawlRecordRepository for SqliteCrawlRecordRepository {
    fn insert(&self, crawl_time: DateTime<Utc>) -> AppResult<CrawlRecord> {
        let conn = self.pool.get()?;
        let created_at = Utc::now();

        conn.execute(
            "INSERT INTO crawl_records (crawl_time, total_items, created_at) VALUES (?1, NULL, ?2)",
            params![crawl_time.timestamp(), created_at.to_rfc3339()],
        )?;

        Ok(CrawlRecord {
            id: conn.last_insert_rowid(),
            crawl_time,
            total_items: None,
            created_at,
        })
    }

    fn get_by_id(&self, id: i64) -> AppResult<Option<CrawlRecord>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT id, crawl_time, total_items, created_at FROM crawl_records WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()?)
    }

    fn get_by_time(&self, crawl_time: DateTime<Utc>) -> AppResult<Option<CrawlRecord>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT id, crawl_time, total_items, created_at FROM crawl_records WHERE crawl_time = ?1",
                params![crawl_time.timestamp()],
                Self::row_to_record,
            )
            .optional()?)
    }

    fn latest(&self) -> AppResult<Option<CrawlRecord>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                "SELECT id, crawl_time, total_items, created_at FROM crawl_records
                 ORDER BY crawl_time DESC LIMIT 1",
                [],
                Self::row_to_record,
            )
            .optional()?)
    }

    fn list_times_since(&self, since: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT crawl_time FROM crawl_records WHERE crawl_time >= ?1 ORDER BY crawl_time ASC",
        )?;
        let times = stmt
            .query_map(params![since.timestamp()], |row| crawl_time_column(0, row.get(0)?))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(times)
    }

    fn count_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> AppResult<u32> {
        let conn = self.pool.get()?;
        let count: u32 = conn.query_row(
            "SELECT COUNT(*) FROM crawl_records WHERE crawl_time >= ?1 AND crawl_time < ?2",
            params![from.timestamp(), to.timestamp()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn set_total_items(&self, id: i64, total_items: u32) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let updated = conn.execute(
            "UPDATE crawl_records SET total_items = ?2 WHERE id = ?1 AND total_items IS NULL",
            params![id, total_items],
        )?;
        Ok(updated > 0)
    }

    fn insert_source_status(&self, status: &CrawlSourceStatus) -> AppResult<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO crawl_source_status (crawl_record_id, platform_id, status) VALUES (?1, ?2, ?3)",
            params![status.crawl_record_id, status.platform_id, status.status.as_str()],
        )?;
        Ok(())
    }

    fn list_source_statuses(&self, crawl_record_id: i64) -> AppResult<Vec<CrawlSourceStatus>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT crawl_record_id, platform_id, status FROM crawl_source_status
             WHERE crawl_record_id = ?1
             ORDER BY platform_id",
        )?;
        let statuses = stmt
            .query_map(params![crawl_record_id], Self::row_to_status)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(statuses)
    }
}
