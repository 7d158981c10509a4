// src/services/storage_failure_tests.rs
//
// Storage failure handling, driven through mocked repositories
//
// INVARIANTS TESTED:
// - Busy / I/O failures surface as retryable errors, never retried internally
// - A UNIQUE hit on crawl_time surfaces as DuplicateCycle
// - Nothing is emitted for a write that did not happen

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::db::testing::test_pool;
    use crate::domain::{CrawlRecord, RawItem, TitleNormalizer, TrendWindow, DEFAULT_STRIP_PATTERN};
    use crate::error::{AppError, ErrorKind};
    use crate::events::EventBus;
    use crate::repositories::crawl_record_repository::MockCrawlRecordRepository;
    use crate::repositories::rank_history_repository::MockRankHistoryRepository;
    use crate::repositories::{PlatformRepository, SqliteNewsItemRepository, SqlitePlatformRepository};
    use crate::services::{
        CrawlCycleService, CrawlSnapshot, CrawlTracker, IdentityResolver, ItemStore,
        RankHistoryLedger,
    };

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, 6, 0, 0).unwrap()
    }

    fn sqlite_error(code: rusqlite::ErrorCode, extended_code: i32) -> AppError {
        AppError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code,
                extended_code,
            },
            None,
        ))
    }

    fn busy() -> AppError {
        sqlite_error(rusqlite::ErrorCode::DatabaseBusy, 5)
    }

    fn unique_violation() -> AppError {
        sqlite_error(rusqlite::ErrorCode::ConstraintViolation, 2067)
    }

    fn open_record() -> CrawlRecord {
        CrawlRecord {
            id: 1,
            crawl_time: t0(),
            total_items: None,
            created_at: t0(),
        }
    }

    #[test]
    fn test_ledger_trend_propagates_failure() {
        let (_dir, pool) = test_pool();

        let mut history = MockRankHistoryRepository::new();
        history
            .expect_list_for_item()
            .withf(|id, window| *id == 7 && *window == TrendWindow::All)
            .returning(|_, _| Err(busy()));
        let ledger = RankHistoryLedger::new(pool, Arc::new(history));

        assert!(ledger.trend(7, TrendWindow::All).unwrap_err().is_retryable());
    }

    #[test]
    fn test_duplicate_cycle_maps_unique_violation() {
        let (_dir, pool) = test_pool();
        let platforms: Arc<dyn PlatformRepository> = Arc::new(SqlitePlatformRepository::new(pool));
        let bus = Arc::new(EventBus::new());

        let mut records = MockCrawlRecordRepository::new();
        records.expect_insert().returning(|_| Err(unique_violation()));

        let tracker = CrawlTracker::new(Arc::new(records), platforms, bus.clone());
        let err = tracker.begin_cycle(t0()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::DuplicateCycle);
        assert!(!err.is_retryable());
        assert!(bus.recent().is_empty());
    }

    #[test]
    fn test_begin_cycle_busy_is_retryable() {
        let (_dir, pool) = test_pool();
        let platforms: Arc<dyn PlatformRepository> = Arc::new(SqlitePlatformRepository::new(pool));

        let mut records = MockCrawlRecordRepository::new();
        records.expect_insert().returning(|_| Err(busy()));

        let tracker = CrawlTracker::new(Arc::new(records), platforms, Arc::new(EventBus::new()));
        let err = tracker.begin_cycle(t0()).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_finalize_on_finalized_record() {
        let (_dir, pool) = test_pool();
        let platforms: Arc<dyn PlatformRepository> = Arc::new(SqlitePlatformRepository::new(pool));

        let mut records = MockCrawlRecordRepository::new();
        records.expect_set_total_items().returning(|_, _| Ok(false));
        records.expect_get_by_id().returning(|_| {
            Ok(Some(CrawlRecord {
                total_items: Some(3),
                ..open_record()
            }))
        });

        let tracker = CrawlTracker::new(Arc::new(records), platforms, Arc::new(EventBus::new()));
        assert_eq!(tracker.finalize(1, 4).unwrap_err().kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_status_write_failure_still_finalizes() {
        let (_dir, pool) = test_pool();
        let bus = Arc::new(EventBus::new());
        let item_repo = Arc::new(SqliteNewsItemRepository::new(pool.clone()));
        let platforms: Arc<dyn PlatformRepository> =
            Arc::new(SqlitePlatformRepository::new(pool.clone()));
        let store = Arc::new(ItemStore::new(
            pool,
            item_repo,
            IdentityResolver::new(Duration::hours(24)),
            TitleNormalizer::new(DEFAULT_STRIP_PATTERN).unwrap(),
            bus.clone(),
        ));

        let mut records = MockCrawlRecordRepository::new();
        records.expect_insert().returning(|_| Ok(open_record()));
        records.expect_get_by_id().returning(|_| Ok(Some(open_record())));
        records
            .expect_insert_source_status()
            .times(1)
            .returning(|_| Err(busy()));
        records
            .expect_set_total_items()
            .withf(|id, total| *id == 1 && *total == 1)
            .times(1)
            .returning(|_, _| Ok(true));
        records.expect_list_source_statuses().returning(|_| Ok(Vec::new()));

        let tracker = Arc::new(CrawlTracker::new(Arc::new(records), platforms, bus));
        let service = CrawlCycleService::new(store.clone(), tracker);

        let snapshot = CrawlSnapshot::new(t0())
            .with_items("weibo", vec![RawItem::new("A", "https://a", 1)]);
        let report = service.ingest(&snapshot).unwrap();
        assert_eq!(report.unrecorded_statuses, vec!["weibo".to_string()]);
        assert!(report.failed_platforms.is_empty());

        let item = store.get_by_key("https://a", "weibo").unwrap().unwrap();
        assert_eq!(item.crawl_count, 1);
    }
}
