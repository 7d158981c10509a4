// src/services/crawl_cycle_service.rs
//
// Crawl Cycle Service - runs one crawl snapshot through the core
//
//   begin_cycle -> upsert every observation -> record source statuses -> finalize
//
// CRITICAL RULES:
// - A duplicate cycle fails before anything is written
// - A snapshot listing the same platform twice is rejected before anything is written
// - Once a cycle is begun it is always finalized, even if a status write fails
// - Malformed observations are skipped, the cycle continues
// - A storage failure on a platform marks that platform failed; upserts that
//   already committed stay durable (no wholesale rollback)
// - Never fetches, never classifies, never sends

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::platform::invariants::validate_id;
use crate::domain::{truncate_to_second, Observation, RawItem, SourceStatus};
use crate::error::{AppError, AppResult, ErrorKind};
use crate::services::crawl_tracker::CrawlTracker;
use crate::services::item_store::{ItemStore, UpsertKind};

/// Everything the scrapers produced for one cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlSnapshot {
    pub crawl_time: DateTime<Utc>,
    pub platforms: Vec<PlatformFetch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformFetch {
    pub platform_id: String,
    pub outcome: FetchOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    Fetched(Vec<RawItem>),
    Failed(String),
}

impl CrawlSnapshot {
    pub fn new(crawl_time: DateTime<Utc>) -> Self {
        Self {
            crawl_time,
            platforms: Vec::new(),
        }
    }

    pub fn with_items(mut self, platform_id: impl Into<String>, items: Vec<RawItem>) -> Self {
        self.platforms.push(PlatformFetch {
            platform_id: platform_id.into(),
            outcome: FetchOutcome::Fetched(items),
        });
        self
    }

    pub fn with_failure(mut self, platform_id: impl Into<String>, reason: impl Into<String>) -> Self {
        self.platforms.push(PlatformFetch {
            platform_id: platform_id.into(),
            outcome: FetchOutcome::Failed(reason.into()),
        });
        self
    }
}

/// Summary of one ingested cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub record_id: i64,
    pub crawl_time: Option<DateTime<Utc>>,
    pub created: usize,
    pub merged: usize,
    /// Repeats of an item already counted in this cycle
    pub cycle_duplicates: usize,
    /// Observations rejected by validation
    pub rejected: usize,
    pub failed_platforms: Vec<String>,
    /// Platforms whose source status could not be written
    pub unrecorded_statuses: Vec<String>,
    /// Every item observed in this cycle, in first-seen order
    pub touched_ids: Vec<i64>,
    /// Items first seen in this cycle
    pub new_item_ids: Vec<i64>,
}

impl CycleReport {
    pub fn total_items(&self) -> u32 {
        (self.created + self.merged + self.cycle_duplicates) as u32
    }
}

pub struct CrawlCycleService {
    item_store: Arc<ItemStore>,
    tracker: Arc<CrawlTracker>,
}

impl CrawlCycleService {
    pub fn new(item_store: Arc<ItemStore>, tracker: Arc<CrawlTracker>) -> Self {
        Self { item_store, tracker }
    }

    pub fn ingest(&self, snapshot: &CrawlSnapshot) -> AppResult<CycleReport> {
        // 0. Reject malformed snapshots before the cycle is claimed
        Self::validate_snapshot(snapshot)?;

        // 1. Claim the cycle
        let record = self.tracker.begin_cycle(snapshot.crawl_time)?;
        let crawl_time = truncate_to_second(snapshot.crawl_time);

        let mut report = CycleReport {
            record_id: record.id,
            crawl_time: Some(record.crawl_time),
            ..Default::default()
        };
        let mut touched = HashSet::new();

        // 2. Merge every platform's observations
        for fetch in &snapshot.platforms {
            if let Err(e) = validate_id(&fetch.platform_id) {
                log::warn!("Skipping platform '{}': {}", fetch.platform_id, e);
                if let FetchOutcome::Fetched(items) = &fetch.outcome {
                    report.rejected += items.len();
                }
                continue;
            }

            let status = match &fetch.outcome {
                FetchOutcome::Fetched(items) => {
                    self.ingest_platform(&fetch.platform_id, items, crawl_time, &mut report, &mut touched)
                }
                FetchOutcome::Failed(reason) => {
                    log::warn!("Platform {} failed to fetch: {}", fetch.platform_id, reason);
                    SourceStatus::Failed
                }
            };

            if status == SourceStatus::Failed {
                report.failed_platforms.push(fetch.platform_id.clone());
            }

            // 3. Record the platform outcome
            if let Err(e) = self
                .tracker
                .record_source_status(record.id, &fetch.platform_id, status)
            {
                log::warn!(
                    "Could not record status of {} for cycle {}: {}",
                    fetch.platform_id,
                    crawl_time,
                    e
                );
                report.unrecorded_statuses.push(fetch.platform_id.clone());
            }
        }

        // 4. Close the cycle
        let finalized = self.tracker.finalize(record.id, report.total_items())?;

        log::info!(
            "Cycle {} ingested: {} new, {} merged, {} repeated, {} rejected, {} platforms failed",
            finalized.crawl_time,
            report.created,
            report.merged,
            report.cycle_duplicates,
            report.rejected,
            report.failed_platforms.len()
        );

        Ok(report)
    }

    fn validate_snapshot(snapshot: &CrawlSnapshot) -> AppResult<()> {
        let mut seen = HashSet::new();
        for fetch in &snapshot.platforms {
            if !seen.insert(fetch.platform_id.as_str()) {
                return Err(AppError::Validation(format!(
                    "Platform {} is listed twice in the snapshot for {}",
                    fetch.platform_id, snapshot.crawl_time
                )));
            }
        }
        Ok(())
    }

    fn ingest_platform(
        &self,
        platform_id: &str,
        items: &[RawItem],
        crawl_time: DateTime<Utc>,
        report: &mut CycleReport,
        touched: &mut HashSet<i64>,
    ) -> SourceStatus {
        for raw in items {
            let obs = Observation::from_raw(platform_id, raw, crawl_time);

            match self.item_store.upsert(&obs) {
                Ok(outcome) => {
                    match outcome.kind {
                        UpsertKind::Created => {
                            report.created += 1;
                            report.new_item_ids.push(outcome.item.id);
                        }
                        UpsertKind::Merged(_) => report.merged += 1,
                        UpsertKind::AlreadyCounted => report.cycle_duplicates += 1,
                    }
                    if touched.insert(outcome.item.id) {
                        report.touched_ids.push(outcome.item.id);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::Validation | ErrorKind::Domain) => {
                    log::warn!("Rejected observation '{}' on {}: {}", obs.title, platform_id, e);
                    report.rejected += 1;
                }
                Err(e) => {
                    log::warn!(
                        "Storage failure while ingesting {}, abandoning platform: {}",
                        platform_id,
                        e
                    );
                    return SourceStatus::Failed;
                }
            }
        }
        SourceStatus::Success
    }
}
