// src/services/rank_history_ledger.rs
//
// Rank History Ledger - append-only log of observed ranks
//
// CRITICAL RULES:
// - Pure append: existing rows are never updated or deleted
// - Exactly one row per (item, crawl cycle)
// - A new row always moves the item's crawl_count / rank projection with it,
//   in the same transaction
// - Trend queries are fresh reads, no cursor state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::TransactionBehavior;

use crate::db::{get_connection, ConnectionPool};
use crate::domain::{truncate_to_second, validate_news_item, RankTrend, TrendWindow};
use crate::error::{AppError, AppResult};
use crate::repositories::news_item_repository::{get_item, update_observed};
use crate::repositories::rank_history_repository::append_entry;
use crate::repositories::RankHistoryRepository;

pub struct RankHistoryLedger {
    pool: Arc<ConnectionPool>,
    history_repo: Arc<dyn RankHistoryRepository>,
}

impl RankHistoryLedger {
    pub fn new(pool: Arc<ConnectionPool>, history_repo: Arc<dyn RankHistoryRepository>) -> Self {
        Self { pool, history_repo }
    }

    /// Record a rank for an item outside of `ItemStore::upsert`, e.g. when
    /// importing history. The item's crawl_count, first/last crawl time and
    /// current rank are updated with the row; the title is not.
    ///
    /// Returns false when the item already has a row for this cycle.
    pub fn append(&self, item_id: i64, rank: i64, crawl_time: DateTime<Utc>) -> AppResult<bool> {
        let rank = u32::try_from(rank)
            .map_err(|_| AppError::Validation(format!("Rank {} out of range", rank)))?;
        let crawl_time = truncate_to_second(crawl_time);

        let mut conn = get_connection(&self.pool)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // 1. Load
        let mut item = get_item(&tx, item_id)?.ok_or(AppError::NotFound)?;

        // 2. Guarded append
        if !append_entry(&tx, item_id, rank, crawl_time)? {
            log::debug!("Rank for item {} at {} already recorded", item_id, crawl_time);
            return Ok(false);
        }

        // 3. Projection
        item.record_rank(rank, crawl_time);
        validate_news_item(&item)?;
        update_observed(&tx, &item)?;

        tx.commit()?;
        Ok(true)
    }

    /// Ordered rank points for an item plus a summary
    pub fn trend(&self, item_id: i64, window: TrendWindow) -> AppResult<RankTrend> {
        let points = self.history_repo.list_for_item(item_id, window)?;
        Ok(RankTrend::from_points(item_id, points))
    }

    pub fn appearances(&self, item_id: i64) -> AppResult<usize> {
        self.history_repo.count_for_item(item_id)
    }
}
