// src/services/push_engine.rs
//
// Push Eligibility Engine - two-phase push protocol
//
//   select_candidates()  -> caller renders + sends externally
//   confirm_pushed(ids)  -> only after the send was acknowledged
//
// CRITICAL RULES:
// - Eligibility is a pure function of stored state
// - Unclassified items are never candidates
// - Selection marks nothing; a crash before confirm means the item is re-selected
// - confirm_pushed is idempotent
// - Delivered reports are logged per UTC day (record_push / has_pushed_on)

use std::cmp::Reverse;
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::config::PushConfig;
use crate::domain::{validate_push_record, Importance, NewsItem, PushRecord};
use crate::error::AppResult;
use crate::events::{CandidatesSelected, EventBus, ItemsPushed};
use crate::repositories::{NewsItemRepository, PushRecordRepository};
use crate::services::item_store::{ItemStore, PushReport};

/// Which items the engine looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateScope {
    /// Items touched by the current cycle
    Touched(Vec<i64>),
    /// Every eligible unpushed item (catch-up after downtime or failed sends)
    AllPending,
}

/// Resolved push policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushPolicy {
    pub importance_levels: Vec<Importance>,
    pub max_per_run: usize,
    pub cross_platform_dedup: bool,
}

impl PushPolicy {
    pub fn from_config(config: &PushConfig) -> AppResult<Self> {
        Ok(Self {
            importance_levels: config.levels()?,
            max_per_run: config.max_push_per_run,
            cross_platform_dedup: config.cross_platform_dedup,
        })
    }
}

pub struct PushEngine {
    item_repo: Arc<dyn NewsItemRepository>,
    push_log: Arc<dyn PushRecordRepository>,
    item_store: Arc<ItemStore>,
    policy: PushPolicy,
    event_bus: Arc<EventBus>,
}

impl PushEngine {
    pub fn new(
        item_repo: Arc<dyn NewsItemRepository>,
        push_log: Arc<dyn PushRecordRepository>,
        item_store: Arc<ItemStore>,
        policy: PushPolicy,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            item_repo,
            push_log,
            item_store,
            policy,
            event_bus,
        }
    }

    pub fn policy(&self) -> &PushPolicy {
        &self.policy
    }

    /// Ordered, deduplicated candidates. Nothing is marked.
    pub fn select_candidates(&self, scope: &CandidateScope) -> AppResult<Vec<NewsItem>> {
        // 1. Eligible by state: labelled with a pushed level, never pushed
        let mut items = match scope {
            CandidateScope::Touched(ids) if ids.is_empty() => Vec::new(),
            CandidateScope::Touched(ids) => self
                .item_repo
                .list_pending_push(&self.policy.importance_levels, Some(ids.as_slice()))?,
            CandidateScope::AllPending => self
                .item_repo
                .list_pending_push(&self.policy.importance_levels, None)?,
        };

        // 2. Order: severity, then best rank, then most recent, then id
        items.sort_by_key(|item| {
            (
                item.importance().map(|i| i.severity_rank()),
                item.rank,
                Reverse(item.last_crawl_time),
                item.id,
            )
        });

        // 3. Same story on several platforms: push it once
        if self.policy.cross_platform_dedup {
            items = self.dedup_across_platforms(items)?;
        }

        // 4. Cap
        items.truncate(self.policy.max_per_run);

        log::info!("Selected {} push candidates", items.len());
        self.event_bus
            .emit(CandidatesSelected::new(items.iter().map(|i| i.id).collect()));

        Ok(items)
    }

    /// Drops items whose title was already pushed from any platform, and keeps
    /// only the first (best ordered) item per title within the batch.
    /// Empty titles are never considered duplicates.
    fn dedup_across_platforms(&self, items: Vec<NewsItem>) -> AppResult<Vec<NewsItem>> {
        let titles: Vec<String> = items
            .iter()
            .map(|i| i.normalized_title.clone())
            .filter(|t| !t.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let mut seen = self.item_repo.pushed_titles(&titles)?;

        let before = items.len();
        let kept: Vec<NewsItem> = items
            .into_iter()
            .filter(|item| item.normalized_title.is_empty() || seen.insert(item.normalized_title.clone()))
            .collect();

        if kept.len() < before {
            log::debug!(
                "Cross-platform dedup removed {} candidates",
                before - kept.len()
            );
        }
        Ok(kept)
    }

    /// Mark items pushed after the external send succeeded.
    pub fn confirm_pushed(&self, item_ids: &[i64]) -> AppResult<PushReport> {
        let report = self.item_store.mark_pushed(item_ids)?;

        log::info!(
            "Push confirmed: {} marked, {} already pushed, {} rejected",
            report.pushed.len(),
            report.already_pushed.len(),
            report.rejected.len()
        );
        if !report.pushed.is_empty() {
            self.event_bus.emit(ItemsPushed::new(report.pushed.clone()));
        }

        Ok(report)
    }

    /// Log a delivered report. Independent of item state.
    pub fn record_push(&self, report_type: &str, pushed_at: DateTime<Utc>) -> AppResult<PushRecord> {
        let record = PushRecord::new(report_type.trim(), pushed_at);
        validate_push_record(&record)?;

        let stored = self.push_log.insert(&record)?;
        log::info!(
            "Recorded '{}' push for {}",
            stored.report_type,
            stored.push_date
        );
        Ok(stored)
    }

    pub fn has_pushed_on(&self, date: NaiveDate) -> AppResult<bool> {
        self.push_log.exists_on(date)
    }

    pub fn pushes_on(&self, date: NaiveDate) -> AppResult<Vec<PushRecord>> {
        self.push_log.list_on(date)
    }
}
