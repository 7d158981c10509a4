// src/repositories/push_record_repository.rs
//
// Delivered-report log, queried per UTC day

use std::sync::Arc;

use chrono::NaiveDate;
use rusqlite::{params, types::Type, Row};

use crate::db::ConnectionPool;
use crate::domain::PushRecord;
use crate::error::AppResult;
use crate::repositories::timestamp_column;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub trait PushRecordRepository: Send + Sync {
    fn insert(&self, record: &PushRecord) -> AppResult<PushRecord>;
    /// Oldest first
    fn list_on(&self, date: NaiveDate) -> AppResult<Vec<PushRecord>>;
    fn exists_on(&self, date: NaiveDate) -> AppResult<bool>;
}

pub struct SqlitePushRecordRepository {
    pool: Arc<ConnectionPool>,
}

impl SqlitePushRecordRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &Row) -> Result<PushRecord, rusqlite::Error> {
        let date_str: String = row.get(1)?;
        let pushed_at_str: String = row.get(3)?;
        Ok(PushRecord {
            id: row.get(0)?,
            push_date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?,
            report_type: row.get(2)?,
            pushed_at: timestamp_column(3, &pushed_at_str)?,
        })
    }
}

impl PushRecordRepository for SqlitePushRecordRepository {
    fn insert(&self, record: &PushRecord) -> AppResult<PushRecord> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO push_records (push_date, report_type, pushed_at) VALUES (?1, ?2, ?3)",
            params![
                record.push_date.format(DATE_FORMAT).to_string(),
                record.report_type,
                record.pushed_at.to_rfc3339()
            ],
        )?;

        Ok(PushRecord {
            id: conn.last_insert_rowid(),
            ..record.clone()
        })
    }

    fn list_on(&self, date: NaiveDate) -> AppResult<Vec<PushRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, push_date, report_type, pushed_at FROM push_records
             WHERE push_date = ?1
             ORDER BY pushed_at ASC, id ASC",
        )?;
        let records = stmt
            .query_map(params![date.format(DATE_FORMAT).to_string()], Self::row_to_record)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn exists_on(&self, date: NaiveDate) -> AppResult<bool> {
        let conn = self.pool.get()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM push_records WHERE push_date = ?1)",
            params![date.format(DATE_FORMAT).to_string()],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
