// src/services/test_support.rs
//
// Shared fixtures for the service scenario tests

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

use crate::application::HotspotCore;
use crate::config::HotspotConfig;
use crate::db::testing::test_pool;
use crate::domain::{Importance, Observation};

pub(crate) struct Harness {
    _dir: TempDir,
    pub core: HotspotCore,
}

pub(crate) fn harness() -> Harness {
    harness_with(HotspotConfig::default())
}

pub(crate) fn harness_with(config: HotspotConfig) -> Harness {
    let (dir, pool) = test_pool();
    let core = HotspotCore::with_pool(pool, &config).unwrap();
    Harness { _dir: dir, core }
}

/// 2025-12-01 at the given hour, UTC
pub(crate) fn t(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
}

pub(crate) fn obs(platform: &str, title: &str, url: &str, rank: i64, time: DateTime<Utc>) -> Observation {
    Observation::new(platform, title, url, rank, time)
}

/// Upsert an observation and label it, returning the item id
pub(crate) fn labelled(core: &HotspotCore, observation: Observation, importance: Importance) -> i64 {
    let id = core.items.upsert(&observation).unwrap().item.id;
    core.items.set_importance(id, importance).unwrap();
    id
}

pub(crate) fn count_rows(core: &HotspotCore, table: &str) -> i64 {
    let conn = core.pool.get().unwrap();
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}
