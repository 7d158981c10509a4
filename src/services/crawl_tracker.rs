// src/services/crawl_tracker.rs
//
// Crawl Record Tracker - one record per crawl cycle
//
// CRITICAL RULES:
// - Cycles are identified by their logical crawl_time (whole seconds)
// - beginCycle on an existing time fails without mutating anything
// - Source statuses are written once per (record, platform)
// - finalize runs once; zero-success cycles are still recorded

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::{truncate_to_second, CrawlRecord, CrawlSourceStatus, SourceStatus};
use crate::error::{is_constraint_violation, AppError, AppResult};
use crate::events::{CycleFinalized, CycleStarted, EventBus};
use crate::repositories::{CrawlRecordRepository, PlatformRepository};

pub struct CrawlTracker {
    record_repo: Arc<dyn CrawlRecordRepository>,
    platform_repo: Arc<dyn PlatformRepository>,
    event_bus: Arc<EventBus>,
}

impl CrawlTracker {
    pub fn new(
        record_repo: Arc<dyn CrawlRecordRepository>,
        platform_repo: Arc<dyn PlatformRepository>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            record_repo,
            platform_repo,
            event_bus,
        }
    }

    pub fn begin_cycle(&self, crawl_time: DateTime<Utc>) -> AppResult<CrawlRecord> {
        let crawl_time = truncate_to_second(crawl_time);

        let record = match self.record_repo.insert(crawl_time) {
            Ok(record) => record,
            Err(AppError::Database(e)) if is_constraint_violation(&e) => {
                log::warn!("Crawl cycle {} already recorded", crawl_time);
                return Err(AppError::DuplicateCycle { crawl_time });
            }
            Err(e) => return Err(e),
        };

        log::info!("Crawl cycle {} started (record {})", crawl_time, record.id);
        self.event_bus
            .emit(CycleStarted::new(record.id, record.crawl_time));

        Ok(record)
    }

    pub fn record_source_status(
        &self,
        record_id: i64,
        platform_id: &str,
        status: SourceStatus,
    ) -> AppResult<()> {
        // 1. Validate the record exists
        if self.record_repo.get_by_id(record_id)?.is_none() {
            return Err(AppError::NotFound);
        }

        // 2. Unknown platforms are registered on first sight
        crate::domain::platform::invariants::validate_id(platform_id)?;
        self.platform_repo.ensure_exists(platform_id)?;

        // 3. Persist once
        let entry = CrawlSourceStatus {
            crawl_record_id: record_id,
            platform_id: platform_id.to_string(),
            status,
        };
        match self.record_repo.insert_source_status(&entry) {
            Ok(()) => Ok(()),
            Err(AppError::Database(e)) if is_constraint_violation(&e) => Err(AppError::Validation(
                format!("Status for {} already recorded in cycle {}", platform_id, record_id),
            )),
            Err(e) => Err(e),
        }
    }

    pub fn finalize(&self, record_id: i64, total_items: u32) -> AppResult<CrawlRecord> {
        if !self.record_repo.set_total_items(record_id, total_items)? {
            return match self.record_repo.get_by_id(record_id)? {
                Some(_) => Err(AppError::Validation(format!(
                    "Crawl record {} is already finalized",
                    record_id
                ))),
                None => Err(AppError::NotFound),
            };
        }

        let record = self
            .record_repo
            .get_by_id(record_id)?
            .ok_or(AppError::NotFound)?;

        let statuses = self.record_repo.list_source_statuses(record_id)?;
        let failed = statuses
            .iter()
            .filter(|s| s.status == SourceStatus::Failed)
            .count();
        if !statuses.is_empty() && failed == statuses.len() {
            log::warn!("Crawl cycle {} had no successful platform", record.crawl_time);
        }
        log::info!(
            "Crawl cycle {} finalized: {} items, {}/{} platforms failed",
            record.crawl_time,
            total_items,
            failed,
            statuses.len()
        );

        self.event_bus
            .emit(CycleFinalized::new(record.id, record.crawl_time, total_items));

        Ok(record)
    }

    pub fn get(&self, record_id: i64) -> AppResult<Option<CrawlRecord>> {
        self.record_repo.get_by_id(record_id)
    }

    pub fn get_by_time(&self, crawl_time: DateTime<Utc>) -> AppResult<Option<CrawlRecord>> {
        self.record_repo.get_by_time(truncate_to_second(crawl_time))
    }

    pub fn latest(&self) -> AppResult<Option<CrawlRecord>> {
        self.record_repo.latest()
    }

    pub fn list_crawl_times(&self, since: DateTime<Utc>) -> AppResult<Vec<DateTime<Utc>>> {
        self.record_repo.list_times_since(since)
    }

    /// True when no cycle was recorded earlier on the same UTC day
    pub fn is_first_cycle_of_day(&self, crawl_time: DateTime<Utc>) -> AppResult<bool> {
        let crawl_time = truncate_to_second(crawl_time);
        let day_start = crawl_time
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(crawl_time);
        Ok(self.record_repo.count_between(day_start, crawl_time)? == 0)
    }

    pub fn source_statuses(&self, record_id: i64) -> AppResult<Vec<CrawlSourceStatus>> {
        self.record_repo.list_source_statuses(record_id)
    }
}
