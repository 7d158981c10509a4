// src/services/crawl_cycle_service_tests.rs
//
// Crawl cycle scenario tests
//
// INVARIANTS TESTED:
// - One crawl record per logical crawl time
// - A duplicate cycle fails without mutating any item
// - Failed platforms are recorded; committed upserts stay durable
// - Malformed observations are skipped, not fatal

#[cfg(test)]
mod ingest_tests {
    use crate::domain::{RawItem, SourceStatus};
    use crate::error::{AppError, ErrorKind};
    use crate::services::crawl_cycle_service::CrawlSnapshot;
    use crate::services::test_support::*;

    fn weibo_items() -> Vec<RawItem> {
        vec![
            RawItem::new("Alpha", "https://weibo/a", 1),
            RawItem::new("Beta", "https://weibo/b", 2),
        ]
    }

    #[test]
    fn test_ingest_reports_and_records_cycle() {
        let h = harness();
        let snapshot = CrawlSnapshot::new(t(8))
            .with_items("weibo", weibo_items())
            .with_items("baidu", vec![RawItem::new("Gamma", "", 1)])
            .with_failure("zhihu", "HTTP 503");

        let report = h.core.cycles.ingest(&snapshot).unwrap();

        assert_eq!(report.created, 3);
        assert_eq!(report.merged, 0);
        assert_eq!(report.rejected, 0);
        assert_eq!(report.failed_platforms, vec!["zhihu".to_string()]);
        assert_eq!(report.touched_ids.len(), 3);
        assert_eq!(report.new_item_ids, report.touched_ids);
        assert_eq!(report.crawl_time, Some(t(8)));

        let record = h.core.tracker.get(report.record_id).unwrap().unwrap();
        assert_eq!(record.crawl_time, t(8));
        assert_eq!(record.total_items, Some(3));
        assert!(record.is_finalized());

        let statuses = h.core.tracker.source_statuses(record.id).unwrap();
        let summary: Vec<_> = statuses
            .iter()
            .map(|s| (s.platform_id.as_str(), s.status))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("baidu", SourceStatus::Success),
                ("weibo", SourceStatus::Success),
                ("zhihu", SourceStatus::Failed),
            ]
        );
    }

    #[test]
    fn test_second_cycle_merges() {
        let h = harness();
        h.core
            .cycles
            .ingest(&CrawlSnapshot::new(t(8)).with_items("weibo", weibo_items()))
            .unwrap();

        let report = h
            .core
            .cycles
            .ingest(&CrawlSnapshot::new(t(9)).with_items(
                "weibo",
                vec![
                    RawItem::new("Alpha (updated)", "https://weibo/a", 2),
                    RawItem::new("Delta", "https://weibo/d", 1),
                ],
            ))
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.merged, 1);
        assert_eq!(report.new_item_ids.len(), 1);
        assert_eq!(report.touched_ids.len(), 2);

        let alpha = h.core.items.get_by_key("https://weibo/a", "weibo").unwrap().unwrap();
        assert_eq!(alpha.crawl_count, 2);
        assert_eq!(alpha.title, "Alpha (updated)");
        assert_eq!(h.core.ledger.trend(alpha.id, crate::domain::TrendWindow::All).unwrap().ranks(), vec![1, 2]);
    }

    #[test]
    fn test_duplicate_cycle_changes_nothing() {
        let h = harness();
        let snapshot = CrawlSnapshot::new(t(8)).with_items("weibo", weibo_items());
        h.core.cycles.ingest(&snapshot).unwrap();

        let err = h.core.cycles.ingest(&snapshot).unwrap_err();
        assert!(matches!(err, AppError::DuplicateCycle { crawl_time } if crawl_time == t(8)));
        assert_eq!(err.kind(), ErrorKind::DuplicateCycle);

        let alpha = h.core.items.get_by_key("https://weibo/a", "weibo").unwrap().unwrap();
        assert_eq!(alpha.crawl_count, 1);
        assert_eq!(count_rows(&h.core, "crawl_records"), 1);
        assert_eq!(count_rows(&h.core, "rank_history"), 2);
    }

    #[test]
    fn test_platform_listed_twice_is_rejected_up_front() {
        let h = harness();
        let doubled = CrawlSnapshot::new(t(8))
            .with_items("weibo", vec![RawItem::new("Alpha", "https://weibo/a", 1)])
            .with_items("weibo", vec![RawItem::new("Beta", "https://weibo/b", 2)]);

        let err = h.core.cycles.ingest(&doubled).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(count_rows(&h.core, "crawl_records"), 0);
        assert_eq!(count_rows(&h.core, "news_items"), 0);

        // The same cycle can still be ingested once the snapshot is fixed
        let fixed = CrawlSnapshot::new(t(8)).with_items("weibo", weibo_items());
        let report = h.core.cycles.ingest(&fixed).unwrap();
        assert_eq!(report.created, 2);
        let record = h.core.tracker.get(report.record_id).unwrap().unwrap();
        assert_eq!(record.total_items, Some(2));
    }

    #[test]
    fn test_all_platforms_failed_is_still_recorded() {
        let h = harness();
        let snapshot = CrawlSnapshot::new(t(8))
            .with_failure("weibo", "timeout")
            .with_failure("baidu", "timeout");

        let report = h.core.cycles.ingest(&snapshot).unwrap();

        assert_eq!(report.total_items(), 0);
        assert_eq!(report.failed_platforms.len(), 2);
        let record = h.core.tracker.latest().unwrap().unwrap();
        assert_eq!(record.total_items, Some(0));
        assert!(h
            .core
            .tracker
            .source_statuses(record.id)
            .unwrap()
            .iter()
            .all(|s| s.status == SourceStatus::Failed));
    }

    #[test]
    fn test_rejected_observations_are_skipped() {
        let h = harness();
        let snapshot = CrawlSnapshot::new(t(8))
            .with_items(
                "weibo",
                vec![
                    RawItem::new("Bad", "https://weibo/bad", -3),
                    RawItem::new("Good", "https://weibo/good", 1),
                ],
            )
            .with_items("   ", vec![RawItem::new("Orphan", "https://x", 1)]);

        let report = h.core.cycles.ingest(&snapshot).unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.rejected, 2);
        assert!(report.failed_platforms.is_empty());
        assert_eq!(count_rows(&h.core, "news_items"), 1);

        let statuses = h.core.tracker.source_statuses(report.record_id).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, SourceStatus::Success);
    }

    #[test]
    fn test_repeats_inside_snapshot_count_once() {
        let h = harness();
        let snapshot = CrawlSnapshot::new(t(8)).with_items(
            "weibo",
            vec![
                RawItem::new("Alpha", "https://weibo/a", 1),
                RawItem::new("Alpha again", "https://weibo/a", 7),
            ],
        );

        let report = h.core.cycles.ingest(&snapshot).unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.cycle_duplicates, 1);
        assert_eq!(report.touched_ids.len(), 1);
        assert_eq!(report.total_items(), 2);

        let alpha = h.core.items.get(report.touched_ids[0]).unwrap().unwrap();
        assert_eq!(alpha.crawl_count, 1);
        assert_eq!(alpha.rank, 1);
    }

    #[test]
    fn test_unknown_platform_is_registered() {
        let h = harness();
        h.core
            .cycles
            .ingest(&CrawlSnapshot::new(t(8)).with_items("ithome", vec![RawItem::new("News", "https://it/1", 1)]))
            .unwrap();

        let platform = h.core.platforms.get("ithome").unwrap().unwrap();
        assert_eq!(platform.id, "ithome");
    }

    #[test]
    fn test_sub_second_times_share_a_cycle() {
        let h = harness();
        let precise = t(8) + chrono::Duration::milliseconds(400);
        h.core.cycles.ingest(&CrawlSnapshot::new(precise)).unwrap();

        let err = h.core.cycles.ingest(&CrawlSnapshot::new(t(8))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateCycle);
        assert!(h.core.tracker.get_by_time(precise).unwrap().is_some());
    }

    #[test]
    fn test_cycle_events_are_emitted() {
        let h = harness();
        h.core.event_bus.drain();

        h.core
            .cycles
            .ingest(&CrawlSnapshot::new(t(8)).with_items("weibo", weibo_items()))
            .unwrap();

        let types: Vec<_> = h
            .core
            .event_bus
            .recent()
            .into_iter()
            .map(|e| e.event_type)
            .collect();
        assert_eq!(
            types,
            vec!["CycleStarted", "ItemCreated", "ItemCreated", "CycleFinalized"]
        );
    }
}

#[cfg(test)]
mod tracker_tests {
    use crate::domain::SourceStatus;
    use crate::error::{AppError, ErrorKind};
    use crate::services::test_support::*;

    #[test]
    fn test_finalize_runs_once() {
        let h = harness();
        let record = h.core.tracker.begin_cycle(t(1)).unwrap();
        assert!(!record.is_finalized());

        let done = h.core.tracker.finalize(record.id, 10).unwrap();
        assert_eq!(done.total_items, Some(10));

        let err = h.core.tracker.finalize(record.id, 11).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(h.core.tracker.get(record.id).unwrap().unwrap().total_items, Some(10));
    }

    #[test]
    fn test_finalize_unknown_record() {
        let h = harness();
        assert!(matches!(h.core.tracker.finalize(77, 1), Err(AppError::NotFound)));
    }

    #[test]
    fn test_source_status_written_once() {
        let h = harness();
        let record = h.core.tracker.begin_cycle(t(1)).unwrap();

        h.core
            .tracker
            .record_source_status(record.id, "weibo", SourceStatus::Success)
            .unwrap();
        let err = h
            .core
            .tracker
            .record_source_status(record.id, "weibo", SourceStatus::Failed)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);

        assert!(matches!(
            h.core.tracker.record_source_status(999, "weibo", SourceStatus::Success),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_latest_and_crawl_times() {
        let h = harness();
        for hour in [3, 1, 2] {
            h.core.tracker.begin_cycle(t(hour)).unwrap();
        }

        assert_eq!(h.core.tracker.latest().unwrap().unwrap().crawl_time, t(3));
        assert_eq!(h.core.tracker.list_crawl_times(t(2)).unwrap(), vec![t(2), t(3)]);
        assert_eq!(h.core.tracker.list_crawl_times(t(0)).unwrap().len(), 3);
    }

    #[test]
    fn test_first_cycle_of_day() {
        let h = harness();
        assert!(h.core.tracker.is_first_cycle_of_day(t(6)).unwrap());

        h.core.tracker.begin_cycle(t(6)).unwrap();
        assert!(h.core.tracker.is_first_cycle_of_day(t(6)).unwrap());
        assert!(!h.core.tracker.is_first_cycle_of_day(t(7)).unwrap());
        assert!(h.core.tracker.is_first_cycle_of_day(t(5)).unwrap());

        // Next UTC day starts over
        let tomorrow = t(6) + chrono::Duration::days(1);
        assert!(h.core.tracker.is_first_cycle_of_day(tomorrow).unwrap());
    }

    #[test]
    fn test_empty_store_has_no_latest() {
        let h = harness();
        assert!(h.core.tracker.latest().unwrap().is_none());
    }
}
