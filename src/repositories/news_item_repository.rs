// src/repositories/news_item_repository.rs
//
// NewsItem persistence

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use crate::db::ConnectionPool;
use crate::domain::{Importance, NewsItem, PushState};
use crate::error::AppResult;
use crate::repositories::{crawl_time_column, enum_column, timestamp_column};

const ITEM_COLUMNS: &str = "id, title, normalized_title, platform_id, rank, url, mobile_url, \
     first_crawl_time, last_crawl_time, crawl_count, importance, has_been_pushed, \
     created_at, updated_at";

/// Keeps `IN (...)` lists well below SQLite's bound parameter limit
const IN_CHUNK: usize = 500;

/// Optional filters for `query_recent`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub platform_id: Option<String>,
    pub importance: Option<Importance>,
    /// Some(false) = never classified, Some(true) = has a label
    pub classified: Option<bool>,
    pub pushed: Option<bool>,
    pub limit: Option<usize>,
}

pub trait NewsItemRepository: Send + Sync {
    fn get_by_id(&self, id: i64) -> AppResult<Option<NewsItem>>;
    fn get_by_key(&self, url: &str, platform_id: &str) -> AppResult<Option<NewsItem>>;
    /// Items last seen at or after `since`, most recent first
    fn query_recent(&self, since: DateTime<Utc>, filter: &ItemFilter) -> AppResult<Vec<NewsItem>>;
    /// Items without importance, most recent first
    fn list_unclassified(&self, limit: usize) -> AppResult<Vec<NewsItem>>;
    /// Unpushed items labelled with one of `levels`, optionally restricted to `ids`
    fn list_pending_push(&self, levels: &[Importance], ids: Option<&[i64]>) -> AppResult<Vec<NewsItem>>;
    /// The subset of `normalized_titles` already carried by a pushed item
    fn pushed_titles(&self, normalized_titles: &[String]) -> AppResult<HashSet<String>>;
}

pub struct SqliteNewsItemRepository {
    pool: Arc<ConnectionPool>,
}

impl SqliteNewsItemRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }
}

/// Map database row to NewsItem - returns rusqlite::Error for query_map compatibility
pub(crate) fn row_to_item(row: &Row) -> Result<NewsItem, rusqlite::Error> {
    let importance_str: Option<String> = row.get(10)?;
    let importance = importance_str
        .map(|s| enum_column::<Importance>(10, &s))
        .transpose()?;
    let has_been_pushed: bool = row.get(11)?;
    let push_state = PushState::from_columns(importance, has_been_pushed)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Integer, Box::new(e)))?;

    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    Ok(NewsItem {
        id: row.get(0)?,
        title: row.get(1)?,
        normalized_title: row.get(2)?,
        platform_id: row.get(3)?,
        rank: row.get(4)?,
        url: row.get(5)?,
        mobile_url: row.get(6)?,
        first_crawl_time: crawl_time_column(7, row.get(7)?)?,
        last_crawl_time: crawl_time_column(8, row.get(8)?)?,
        crawl_count: row.get(9)?,
        push_state,
        created_at: timestamp_column(12, &created_at_str)?,
        updated_at: timestamp_column(13, &updated_at_str)?,
    })
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============================================================================
// TRANSACTIONAL STATEMENTS
// ============================================================================

pub(crate) fn get_item(conn: &Connection, id: i64) -> AppResult<Option<NewsItem>> {
    let sql = format!("SELECT {} FROM news_items WHERE id = ?1", ITEM_COLUMNS);
    Ok(conn.query_row(&sql, params![id], row_to_item).optional()?)
}

pub(crate) fn find_by_url(conn: &Connection, url: &str, platform_id: &str) -> AppResult<Option<NewsItem>> {
    if url.is_empty() {
        return Ok(None);
    }
    let sql = format!(
        "SELECT {} FROM news_items WHERE url = ?1 AND platform_id = ?2",
        ITEM_COLUMNS
    );
    Ok(conn
        .query_row(&sql, params![url, platform_id], row_to_item)
        .optional()?)
}

/// Best title match whose last_crawl_time lies in [from, to].
/// Ties go to the most recently seen item, then the oldest id.
pub(crate) fn find_by_title_in_window(
    conn: &Connection,
    normalized_title: &str,
    platform_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> AppResult<Option<NewsItem>> {
    let sql = format!(
        "SELECT {} FROM news_items
         WHERE normalized_title = ?1
           AND normalized_title <> ''
           AND platform_id = ?2
           AND last_crawl_time >= ?3
           AND first_crawl_time <= ?4
         ORDER BY last_crawl_time DESC, id ASC
         LIMIT 1",
        ITEM_COLUMNS
    );
    Ok(conn
        .query_row(
            &sql,
            params![normalized_title, platform_id, from.timestamp(), to.timestamp()],
            row_to_item,
        )
        .optional()?)
}

/// Insert unless another row already owns (url, platform_id).
/// Returns the new id, or None when the insert lost to an existing row.
pub(crate) fn insert_if_absent(conn: &Connection, item: &NewsItem) -> AppResult<Option<i64>> {
    let inserted = conn.execute(
        "INSERT INTO news_items (
            title, normalized_title, platform_id, rank, url, mobile_url,
            first_crawl_time, last_crawl_time, crawl_count, importance, has_been_pushed,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        ON CONFLICT DO NOTHING",
        params![
            item.title,
            item.normalized_title,
            item.platform_id,
            item.rank,
            item.url,
            item.mobile_url,
            item.first_crawl_time.timestamp(),
            item.last_crawl_time.timestamp(),
            item.crawl_count,
            item.importance().map(|i| i.as_str()),
            item.has_been_pushed(),
            item.created_at.to_rfc3339(),
            item.updated_at.to_rfc3339(),
        ],
    )?;

    if inserted == 0 {
        return Ok(None);
    }
    Ok(Some(conn.last_insert_rowid()))
}

/// Persist the observation-owned columns of a merged item
pub(crate) fn update_observed(conn: &Connection, item: &NewsItem) -> AppResult<()> {
    conn.execute(
        "UPDATE news_items SET
            title = ?2,
            normalized_title = ?3,
            rank = ?4,
            mobile_url = ?5,
            first_crawl_time = ?6,
            last_crawl_time = ?7,
            crawl_count = ?8,
            updated_at = ?9
         WHERE id = ?1",
        params![
            item.id,
            item.title,
            item.normalized_title,
            item.rank,
            item.mobile_url,
            item.first_crawl_time.timestamp(),
            item.last_crawl_time.timestamp(),
            item.crawl_count,
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Persist the classification-owned columns
pub(crate) fn update_push_state(conn: &Connection, item: &NewsItem) -> AppResult<()> {
    conn.execute(
        "UPDATE news_items SET importance = ?2, has_been_pushed = ?3, updated_at = ?4
         WHERE id = ?1",
        params![
            item.id,
            item.importance().map(|i| i.as_str()),
            item.has_been_pushed(),
            item.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

// ============================================================================
// POOL-BACKED QUERIES
// ============================================================================

impl NewsItemRepository for SqliteNewsItemRepository {
    fn get_by_id(&self, id: i64) -> AppResult<Option<NewsItem>> {
        let conn = self.pool.get()?;
        get_item(&conn, id)
    }

    fn get_by_key(&self, url: &str, platform_id: &str) -> AppResult<Option<NewsItem>> {
        let conn = self.pool.get()?;
        find_by_url(&conn, url, platform_id)
    }

    fn query_recent(&self, since: DateTime<Utc>, filter: &ItemFilter) -> AppResult<Vec<NewsItem>> {
        let conn = self.pool.get()?;

        let mut sql = format!(
            "SELECT {} FROM news_items WHERE last_crawl_time >= ?",
            ITEM_COLUMNS
        );
        let mut values: Vec<Value> = vec![Value::Integer(since.timestamp())];

        if let Some(platform_id) = &filter.platform_id {
            sql.push_str(" AND platform_id = ?");
            values.push(Value::Text(platform_id.clone()));
        }
        if let Some(importance) = filter.importance {
            sql.push_str(" AND importance = ?");
            values.push(Value::Text(importance.as_str().to_string()));
        }
        match filter.classified {
            Some(true) => sql.push_str(" AND importance IS NOT NULL"),
            Some(false) => sql.push_str(" AND importance IS NULL"),
            None => {}
        }
        if let Some(pushed) = filter.pushed {
            sql.push_str(" AND has_been_pushed = ?");
            values.push(Value::Integer(i64::from(pushed)));
        }
        sql.push_str(" ORDER BY last_crawl_time DESC, rank ASC, id ASC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(values.iter()), row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn list_unclassified(&self, limit: usize) -> AppResult<Vec<NewsItem>> {
        let conn = self.pool.get()?;

        let sql = format!(
            "SELECT {} FROM news_items
             WHERE importance IS NULL
             ORDER BY last_crawl_time DESC, rank ASC, id ASC
             LIMIT ?1",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![limit as i64], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    fn list_pending_push(&self, levels: &[Importance], ids: Option<&[i64]>) -> AppResult<Vec<NewsItem>> {
        if levels.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.pool.get()?;

        let base = format!(
            "SELECT {} FROM news_items
             WHERE has_been_pushed = 0 AND importance IN ({})",
            ITEM_COLUMNS,
            placeholders(levels.len())
        );
        let level_values: Vec<Value> = levels
            .iter()
            .map(|l| Value::Text(l.as_str().to_string()))
            .collect();

        let mut items = Vec::new();
        match ids {
            None => {
                let mut stmt = conn.prepare(&base)?;
                let rows = stmt
                    .query_map(params_from_iter(level_values.iter()), row_to_item)?
                    .collect::<Result<Vec<_>, _>>()?;
                items.extend(rows);
            }
            Some(ids) => {
                for chunk in ids.chunks(IN_CHUNK) {
                    let sql = format!("{} AND id IN ({})", base, placeholders(chunk.len()));
                    let mut values = level_values.clone();
                    values.extend(chunk.iter().map(|id| Value::Integer(*id)));

                    let mut stmt = conn.prepare(&sql)?;
                    let rows = stmt
                        .query_map(params_from_iter(values.iter()), row_to_item)?
                        .collect::<Result<Vec<_>, _>>()?;
                    items.extend(rows);
                }
            }
        }

        Ok(items)
    }

    fn pushed_titles(&self, normalized_titles: &[String]) -> AppResult<HashSet<String>> {
        let conn = self.pool.get()?;
        let mut found = HashSet::new();

        for chunk in normalized_titles.chunks(IN_CHUNK) {
            let sql = format!(
                "SELECT DISTINCT normalized_title FROM news_items
                 WHERE has_been_pushed = 1 AND normalized_title IN ({})",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter()), |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            found.extend(rows);
        }

        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::test_pool;
    use crate::domain::Observation;
    use crate::repositories::platform_repository::ensure_platform;
    use chrono::{Duration, TimeZone};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
    }

    fn seed(conn: &Connection, platform: &str, title: &str, url: &str, time: DateTime<Utc>) -> NewsItem {
        ensure_platform(conn, platform).unwrap();
        let obs = Observation::new(platform, title, url, 1, time);
        let mut item = NewsItem::first_observed(&obs, title.to_lowercase());
        item.id = insert_if_absent(conn, &item).unwrap().unwrap();
        item
    }

    #[test]
    fn test_insert_and_read_back() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();

        let item = seed(&conn, "weibo", "Hello", "https://a", t(1));
        let loaded = get_item(&conn, item.id).unwrap().unwrap();

        assert_eq!(loaded.title, "Hello");
        assert_eq!(loaded.first_crawl_time, t(1));
        assert_eq!(loaded.push_state, PushState::Unclassified);
    }

    #[test]
    fn test_insert_loses_to_existing_key() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();

        let first = seed(&conn, "weibo", "Hello", "https://a", t(1));
        let obs = Observation::new("weibo", "Other", "https://a", 2, t(2));
        let dup = NewsItem::first_observed(&obs, "other".to_string());

        assert_eq!(insert_if_absent(&conn, &dup).unwrap(), None);
        assert_eq!(find_by_url(&conn, "https://a", "weibo").unwrap().unwrap().id, first.id);
    }

    #[test]
    fn test_title_window_lookup_prefers_recent() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();

        let _older = seed(&conn, "baidu", "Story", "", t(1));
        let newer = seed(&conn, "baidu", "Story", "", t(3));

        let found = find_by_title_in_window(&conn, "story", "baidu", t(0), t(4))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, newer.id);

        let none = find_by_title_in_window(&conn, "story", "baidu", t(5), t(6)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_empty_title_never_matches() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();

        seed(&conn, "baidu", "", "", t(1));
        let found = find_by_title_in_window(&conn, "", "baidu", t(0), t(2)).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_query_recent_filters() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();
        let repo = SqliteNewsItemRepository::new(Arc::clone(&pool));

        let mut a = seed(&conn, "weibo", "A", "https://a", t(1));
        seed(&conn, "zhihu", "B", "https://b", t(2));
        seed(&conn, "zhihu", "C", "https://c", t(3) + Duration::minutes(5));

        a.classify(Importance::High).unwrap();
        update_push_state(&conn, &a).unwrap();

        let all = repo.query_recent(t(0), &ItemFilter::default()).unwrap();
        assert_eq!(all.iter().map(|i| i.title.as_str()).collect::<Vec<_>>(), vec!["C", "B", "A"]);

        let zhihu = ItemFilter {
            platform_id: Some("zhihu".to_string()),
            limit: Some(1),
            ..Default::default()
        };
        let recent = repo.query_recent(t(0), &zhihu).unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, "C");

        let labelled = ItemFilter {
            classified: Some(true),
            ..Default::default()
        };
        assert_eq!(repo.query_recent(t(0), &labelled).unwrap()[0].id, a.id);

        assert_eq!(repo.query_recent(t(2), &ItemFilter::default()).unwrap().len(), 2);
    }

    #[test]
    fn test_pending_push_and_pushed_titles() {
        let (_dir, pool) = test_pool();
        let conn = pool.get().unwrap();
        let repo = SqliteNewsItemRepository::new(Arc::clone(&pool));

        let mut a = seed(&conn, "weibo", "A", "https://a", t(1));
        let mut b = seed(&conn, "zhihu", "B", "https://b", t(1));
        let mut c = seed(&conn, "zhihu", "C", "https://c", t(1));

        a.classify(Importance::Critical).unwrap();
        b.classify(Importance::Low).unwrap();
        c.classify(Importance::High).unwrap();
        c.mark_pushed().unwrap();
        for item in [&a, &b, &c] {
            update_push_state(&conn, item).unwrap();
        }

        let levels = [Importance::Critical, Importance::High];
        let pending = repo.list_pending_push(&levels, None).unwrap();
        assert_eq!(pending.iter().map(|i| i.id).collect::<Vec<_>>(), vec![a.id]);

        let scoped = repo.list_pending_push(&levels, Some(&[b.id, c.id])).unwrap();
        assert!(scoped.is_empty());

        let titles = repo
            .pushed_titles(&["a".to_string(), "c".to_string()])
            .unwrap();
        assert!(titles.contains("c"));
        assert!(!titles.contains("a"));
    }
}
