// src/services/item_store.rs
//
// Item Store - the durable table of deduplicated items
//
// CRITICAL RULES:
// - Every write runs in one IMMEDIATE transaction (single writer at a time)
// - Resolution, per-cycle guard and merge commit together or not at all
// - A lost insert race on (url, platform_id) is retried as a merge, never surfaced
// - Merges never touch importance / push state
// - Events are emitted only after commit
// - No retries: storage errors go back to the caller

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior};

use crate::db::{get_connection, ConnectionPool};
use crate::domain::{
    validate_news_item, validate_observation, Importance, MergeEffect, NewsItem, Observation,
    PushTransition, TitleNormalizer,
};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, ImportanceAssigned, ItemCreated, ItemMerged};
use crate::repositories::news_item_repository::{
    get_item, insert_if_absent, update_observed, update_push_state,
};
use crate::repositories::platform_repository::ensure_platform;
use crate::repositories::rank_history_repository::append_entry;
use crate::repositories::{ItemFilter, NewsItemRepository};
use crate::services::identity_resolver::{IdentityResolver, Resolution};

/// What `upsert` did with an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertKind {
    Created,
    Merged(MergeEffect),
    /// The item was already counted for this cycle; nothing changed
    AlreadyCounted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub item: NewsItem,
    pub kind: UpsertKind,
}

/// Per-id result of `mark_pushed`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Transitioned to pushed in this call
    pub pushed: Vec<i64>,
    /// Were already pushed (no-op)
    pub already_pushed: Vec<i64>,
    /// Unknown or unclassified ids, with the reason
    pub rejected: Vec<(i64, String)>,
}

pub struct ItemStore {
    pool: Arc<ConnectionPool>,
    item_repo: Arc<dyn NewsItemRepository>,
    resolver: IdentityResolver,
    normalizer: TitleNormalizer,
    event_bus: Arc<EventBus>,
}

impl ItemStore {
    pub fn new(
        pool: Arc<ConnectionPool>,
        item_repo: Arc<dyn NewsItemRepository>,
        resolver: IdentityResolver,
        normalizer: TitleNormalizer,
        event_bus: Arc<EventBus>,
    ) -> Self {
        Self {
            pool,
            item_repo,
            resolver,
            normalizer,
            event_bus,
        }
    }

    pub fn normalizer(&self) -> &TitleNormalizer {
        &self.normalizer
    }

    /// Merge one observation into the store.
    pub fn upsert(&self, obs: &Observation) -> AppResult<UpsertOutcome> {
        // 1. Reject malformed observations before touching storage
        validate_observation(obs).map_err(|e| AppError::Validation(e.to_string()))?;
        let normalized = self.normalizer.normalize(&obs.title);

        // 2. Resolve + guard + write in one transaction
        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_platform(&tx, &obs.platform_id)?;

        let outcome = match self.resolver.resolve(&tx, obs, &normalized)? {
            Resolution::Existing(item) => Self::merge_into(&tx, item, obs, normalized)?,
            Resolution::New => {
                let mut item = NewsItem::first_observed(obs, normalized.clone());
                match insert_if_absent(&tx, &item)? {
                    Some(id) => {
                        item.id = id;
                        append_entry(&tx, id, item.rank, obs.crawl_time)?;
                        UpsertOutcome {
                            item,
                            kind: UpsertKind::Created,
                        }
                    }
                    None => {
                        // Lost the race for (url, platform_id): retry as a merge
                        log::warn!(
                            "Insert race on ({}, {}), merging into the surviving row",
                            obs.url,
                            obs.platform_id
                        );
                        let existing = self
                            .resolver
                            .resolve(&tx, obs, &normalized)?;
                        match existing {
                            Resolution::Existing(item) => Self::merge_into(&tx, item, obs, normalized)?,
                            Resolution::New => {
                                return Err(AppError::Other(format!(
                                    "Conflicting row for ({}, {}) disappeared",
                                    obs.url, obs.platform_id
                                )))
                            }
                        }
                    }
                }
            }
        };

        tx.commit()?;

        // 3. Emit events
        match outcome.kind {
            UpsertKind::Created => {
                log::debug!(
                    "Created item {} on {} ('{}')",
                    outcome.item.id,
                    outcome.item.platform_id,
                    outcome.item.title
                );
                self.event_bus.emit(ItemCreated::new(
                    outcome.item.id,
                    outcome.item.platform_id.clone(),
                    outcome.item.title.clone(),
                    obs.crawl_time,
                ));
            }
            UpsertKind::Merged(effect) => {
                log::debug!(
                    "Merged observation into item {} (count {}, {:?})",
                    outcome.item.id,
                    outcome.item.crawl_count,
                    effect
                );
                self.event_bus.emit(ItemMerged::new(
                    outcome.item.id,
                    outcome.item.rank,
                    outcome.item.crawl_count,
                    obs.crawl_time,
                    effect,
                ));
            }
            UpsertKind::AlreadyCounted => {
                log::debug!(
                    "Item {} already counted for cycle {}",
                    outcome.item.id,
                    obs.crawl_time
                );
            }
        }

        Ok(outcome)
    }

    fn merge_into(
        conn: &Connection,
        mut item: NewsItem,
        obs: &Observation,
        normalized: String,
    ) -> AppResult<UpsertOutcome> {
        // The ledger row is the per-cycle guard for crawl_count as well
        if !append_entry(conn, item.id, obs.stored_rank(), obs.crawl_time)? {
            return Ok(UpsertOutcome {
                item,
                kind: UpsertKind::AlreadyCounted,
            });
        }

        let effect = item.merge_observation(obs, normalized);
        validate_news_item(&item)?;
        update_observed(conn, &item)?;

        Ok(UpsertOutcome {
            item,
            kind: UpsertKind::Merged(effect),
        })
    }

    pub fn get(&self, id: i64) -> AppResult<Option<NewsItem>> {
        self.item_repo.get_by_id(id)
    }

    pub fn get_by_key(&self, url: &str, platform_id: &str) -> AppResult<Option<NewsItem>> {
        self.item_repo.get_by_key(url.trim(), platform_id)
    }

    pub fn query_recent(&self, since: DateTime<Utc>, filter: &ItemFilter) -> AppResult<Vec<NewsItem>> {
        self.item_repo.query_recent(since, filter)
    }

    /// Feed for the external classifier
    pub fn list_unclassified(&self, limit: usize) -> AppResult<Vec<NewsItem>> {
        self.item_repo.list_unclassified(limit)
    }

    /// Apply a classifier label. Relabelling is allowed until the item is pushed.
    pub fn set_importance(&self, item_id: i64, importance: Importance) -> AppResult<NewsItem> {
        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 1. Load
        let mut item = get_item(&tx, item_id)?.ok_or(AppError::NotFound)?;
        let previous = item.importance();

        // 2. Transition
        item.classify(importance)?;

        // 3. Persist
        update_push_state(&tx, &item)?;
        tx.commit()?;

        // 4. Emit event
        self.event_bus
            .emit(ImportanceAssigned::new(item.id, previous, importance));

        Ok(item)
    }

    /// Mark items pushed. Call only after the external send was acknowledged.
    ///
    /// Idempotent per id. Unknown or unclassified ids are reported, not fatal.
    /// A storage error aborts the whole batch so every id stays eligible.
    pub fn mark_pushed(&self, item_ids: &[i64]) -> AppResult<PushReport> {
        let mut report = PushReport::default();
        if item_ids.is_empty() {
            return Ok(report);
        }

        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for &id in item_ids {
            let Some(mut item) = get_item(&tx, id)? else {
                report.rejected.push((id, "item not found".to_string()));
                continue;
            };

            match item.mark_pushed() {
                Ok(PushTransition::Pushed) => {
                    update_push_state(&tx, &item)?;
                    report.pushed.push(id);
                }
                Ok(PushTransition::AlreadyPushed) => {
                    if !report.already_pushed.contains(&id) && !report.pushed.contains(&id) {
                        report.already_pushed.push(id);
                    }
                }
                Err(e) => report.rejected.push((id, e.to_string())),
            }
        }

        tx.commit()?;

        if !report.rejected.is_empty() {
            log::warn!("{} ids could not be marked pushed", report.rejected.len());
        }
        Ok(report)
    }
}
