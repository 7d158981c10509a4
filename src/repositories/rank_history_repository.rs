// src/repositories/rank_history_repository.rs
//
// Rank history persistence (append-only: no update, no delete)

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use crate::db::ConnectionPool;
use crate::domain::{RankHistoryEntry, TrendWindow};
use crate::error::AppResult;
use crate::repositories::{crawl_time_column, timestamp_column};

#[cfg_attr(test, mockall::automock)]
pub trait RankHistoryRepository: Send + Sync {
    /// Returns false when the (item, crawl_time) row already existed
    fn append(&self, news_item_id: i64, rank: u32, crawl_time: DateTime<Utc>) -> AppResult<bool>;
    /// Entries ascending by crawl_time
    fn list_for_item(&self, news_item_id: i64, window: TrendWindow) -> AppResult<Vec<RankHistoryEntry>>;
    fn count_for_item(&self, news_item_id: i64) -> AppResult<usize>;
}

pub struct SqliteRankHistoryRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteRankHistoryRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: &Row) -> Result<RankHistoryEntry, rusqlite::Error> {
        let created_at_str: String = row.get(4)?;
        Ok(RankHistoryEntry {
            id: row.get(0)?,
            news_item_id: row.get(1)?,
            rank: row.get(2)?,
            crawl_time: crawl_time_column(3, row.get(3)?)?,
            created_at: timestamp_column(4, &created_at_str)?,
        })
    }
}

/// Transactional append. The UNIQUE(news_item_id, crawl_time) constraint is the
/// per-cycle guard: a second observation of the same item in the same cycle
/// inserts nothing and returns false.
pub(crate) fn append_entry(
    conn: &Connection,
    news_item_id: i64,
    rank: u32,
    crawl_time: DateTime<Utc>,
) -> AppResult<bool> {
    let inserted = conn.execute(
        "INSERT INTO rank_history (news_item_id, rank, crawl_time, created_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(news_item_id, crawl_time) DO NOTHING",
        params![
            news_item_id,
            rank,
            crawl_time.timestamp(),
            Utc::now().to_rfc3339()
        ],
    )?;
    Ok(inserted > 0)
}

impl RankHistoryRepository for SqliteRankHistoryRepository {
    fn append(&self, news_item_id: i64, rank: u32, crawl_time: DateTime<Utc>) -> AppResult<bool> {
        let conn = self.pool.get()?;
        append_entry(&conn, news_item_id, rank, crawl_time)
    }

    fn list_for_item(&self, news_item_id: i64, window: TrendWindow) -> AppResult<Vec<RankHistoryEntry>> {
        let conn = self.pool.get()?;

        let mut entries = match window {
            TrendWindow::All => {
                let mut stmt = conn.prepare(
                    "SELECT id, news_item_id, rank, crawl_time, created_at
                     FROM rank_history
                     WHERE news_item_id = ?1
                     ORDER BY crawl_time ASC",
                )?;
                let rows = stmt
                    .query_map(params![news_item_id], Self::row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            TrendWindow::Since(since) => {
                let mut stmt = conn.prepare(
                    "SELECT id, news_item_id, rank, crawl_time, created_at
                     FROM rank_history
                     WHERE news_item_id = ?1 AND crawl_time >= ?2
                     ORDER BY crawl_time ASC",
                )?;
                let rows = stmt
                    .query_map(params![news_item_id, since.timestamp()], Self::row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
            TrendWindow::LastN(n) => {
                let mut stmt = conn.prepare(
                    "SELECT id, news_item_id, rank, crawl_time, created_at
                     FROM rank_history
                     WHERE news_item_id = ?1
                     ORDER BY crawl_time DESC
                     LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![news_item_id, n as i64], Self::row_to_entry)?
                    .collect::<Result<Vec<_>, _>>()?;
                rows
            }
        };

        entries.sort_by_key(|e| e.crawl_time);
        Ok(entries)
    }

    fn count_for_item(&self, news_item_id: i64) -> AppResult<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM rank_history WHERE news_item_id = ?1",
            params![news_item_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_pool;
    use crate::domain::{NewsItem, Observation};
    use crate::repositories::news_item_repository::insert_if_absent;
    use crate::repositories::platform_repository::ensure_platform;
    use chrono::TimeZone;

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
    }

    fn seeded() -> (tempfile::TempDir, SqliteRankHistoryRepository, i64) {
        let (dir, pool) = test_pool();
        let conn = pool.get().unwrap();
        ensure_platform(&conn, "weibo").unwrap();
        let obs = Observation::new("weibo", "A", "https://a", 3, t(1));
        let id = insert_if_absent(&conn, &NewsItem::first_observed(&obs, "a".to_string()))
            .unwrap()
            .unwrap();
        (dir, SqliteRankHistoryRepository::new(Arc::clone(&pool)), id)
    }

    #[test]
    fn test_append_is_guarded_per_cycle() {
        let (_dir, repo, id) = seeded();

        assert!(repo.append(id, 3, t(1)).unwrap());
        assert!(!repo.append(id, 1, t(1)).unwrap());
        assert_eq!(repo.count_for_item(id).unwrap(), 1);

        let entries = repo.list_for_item(id, TrendWindow::All).unwrap();
        assert_eq!(entries[0].rank, 3);
    }

    #[test]
    fn test_windows_are_ordered_ascending() {
        let (_dir, repo, id) = seeded();

        // Appended out of order on purpose
        for (hour, rank) in [(4, 2), (1, 9), (3, 5), (2, 7)] {
            repo.append(id, rank, t(hour)).unwrap();
        }

        let all = repo.list_for_item(id, TrendWindow::All).unwrap();
        assert_eq!(all.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![9, 7, 5, 2]);

        let since = repo.list_for_item(id, TrendWindow::Since(t(3))).unwrap();
        assert_eq!(since.iter().map(|e| e.rank).collect::<Vec<_>>(), vec![5, 2]);

        let last_two = repo.list_for_item(id, TrendWindow::LastN(2)).unwrap();
        assert_eq!(last_two.iter().map(|e| e.crawl_time).collect::<Vec<_>>(), vec![t(3), t(4)]);
    }

    #[test]
    fn test_history_rows_cannot_be_updated() {
        let (_dir, repo, id) = seeded();
        repo.append(id, 3, t(1)).unwrap();

        let conn = repo.pool.get().unwrap();
        assert!(conn.execute("UPDATE rank_history SET rank = 1", []).is_err());
    }
}
