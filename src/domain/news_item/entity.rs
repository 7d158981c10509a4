use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::push_state::{PushState, PushTransition};
use crate::domain::importance::Importance;
use crate::domain::observation::Observation;
use crate::domain::DomainResult;

/// The deduplicated record of one real-world story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Database identity, 0 until first persisted
    pub id: i64,

    /// Latest observed title
    pub title: String,

    /// Canonical comparison key derived from `title`
    pub normalized_title: String,

    pub platform_id: String,

    /// Rank from the most recent cycle (lower is better)
    pub rank: u32,

    /// Empty for rank-only sources
    pub url: String,
    pub mobile_url: String,

    pub first_crawl_time: DateTime<Utc>,
    pub last_crawl_time: DateTime<Utc>,

    /// Number of distinct cycles the item was observed in
    pub crawl_count: u32,

    pub push_state: PushState,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// How a merge changed the item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeEffect {
    /// The observation is the newest so far: title, rank and last time moved forward
    Advanced,

    /// An older cycle arrived late: counted, but the latest data was kept
    Backfilled,
}

impl NewsItem {
    /// Build an unsaved item from its first observation.
    pub fn first_observed(obs: &Observation, normalized_title: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            title: obs.title.clone(),
            normalized_title,
            platform_id: obs.platform_id.clone(),
            rank: obs.stored_rank(),
            url: obs.url.clone(),
            mobile_url: obs.mobile_url.clone(),
            first_crawl_time: obs.crawl_time,
            last_crawl_time: obs.crawl_time,
            crawl_count: 1,
            push_state: PushState::Unclassified,
            created_at: now,
            updated_at: now,
        }
    }

    /// Fold an observation from a cycle not yet counted for this item.
    ///
    /// The caller is responsible for the per-cycle guard (the ledger row);
    /// importance and push state are left alone.
    pub fn merge_observation(&mut self, obs: &Observation, normalized_title: String) -> MergeEffect {
        let effect = self.record_rank(obs.stored_rank(), obs.crawl_time);

        if effect == MergeEffect::Advanced {
            self.title = obs.title.clone();
            self.normalized_title = normalized_title;
            if !obs.mobile_url.is_empty() {
                self.mobile_url = obs.mobile_url.clone();
            }
        }
        effect
    }

    /// Count one more cycle for this item. `rank` and `last_crawl_time` follow the
    /// latest cycle only; an older cycle can only lower `first_crawl_time`.
    pub fn record_rank(&mut self, rank: u32, crawl_time: DateTime<Utc>) -> MergeEffect {
        self.crawl_count += 1;

        if crawl_time < self.first_crawl_time {
            self.first_crawl_time = crawl_time;
        }

        let effect = if crawl_time >= self.last_crawl_time {
            self.last_crawl_time = crawl_time;
            self.rank = rank;
            MergeEffect::Advanced
        } else {
            MergeEffect::Backfilled
        };

        self.updated_at = Utc::now();
        effect
    }

    pub fn importance(&self) -> Option<Importance> {
        self.push_state.importance()
    }

    pub fn has_been_pushed(&self) -> bool {
        self.push_state.has_been_pushed()
    }

    pub fn classify(&mut self, importance: Importance) -> DomainResult<()> {
        self.push_state = self.push_state.classify(importance)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn mark_pushed(&mut self) -> DomainResult<PushTransition> {
        let (state, transition) = self.push_state.push()?;
        if transition == PushTransition::Pushed {
            self.push_state = state;
            self.updated_at = Utc::now();
        }
        Ok(transition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_merge_advances_latest_fields() {
        let first = Observation::new("weibo", "A", "u1", 3, t(1));
        let mut item = NewsItem::first_observed(&first, "a".to_string());

        let second = Observation::new("weibo", "A v2", "u1", 1, t(2));
        let effect = item.merge_observation(&second, "a v2".to_string());

        assert_eq!(effect, MergeEffect::Advanced);
        assert_eq!(item.title, "A v2");
        assert_eq!(item.rank, 1);
        assert_eq!(item.crawl_count, 2);
        assert_eq!(item.first_crawl_time, t(1));
        assert_eq!(item.last_crawl_time, t(2));
    }

    #[test]
    fn test_record_rank_keeps_title() {
        let first = Observation::new("weibo", "A", "u1", 3, t(2));
        let mut item = NewsItem::first_observed(&first, "a".to_string());

        assert_eq!(item.record_rank(7, t(1)), MergeEffect::Backfilled);
        assert_eq!(item.rank, 3);
        assert_eq!(item.first_crawl_time, t(1));

        assert_eq!(item.record_rank(1, t(4)), MergeEffect::Advanced);
        assert_eq!(item.rank, 1);
        assert_eq!(item.last_crawl_time, t(4));
        assert_eq!(item.crawl_count, 3);
        assert_eq!(item.title, "A");
    }

    #[test]
    fn test_late_cycle_backfills_without_rewinding() {
        let latest = Observation::new("weibo", "Newest", "u1", 2, t(5));
        let mut item = NewsItem::first_observed(&latest, "newest".to_string());

        let late = Observation::new("weibo", "Oldest", "u1", 9, t(5) - Duration::hours(3));
        let effect = item.merge_observation(&late, "oldest".to_string());

        assert_eq!(effect, MergeEffect::Backfilled);
        assert_eq!(item.title, "Newest");
        assert_eq!(item.rank, 2);
        assert_eq!(item.crawl_count, 2);
        assert_eq!(item.first_crawl_time, t(2));
        assert_eq!(item.last_crawl_time, t(5));
    }

    #[test]
    fn test_merge_leaves_push_state_alone() {
        let obs = Observation::new("zhihu", "Q", "u", 1, t(1));
        let mut item = NewsItem::first_observed(&obs, "q".to_string());
        item.classify(Importance::High).unwrap();
        item.mark_pushed().unwrap();

        item.merge_observation(&Observation::new("zhihu", "Q", "u", 4, t(2)), "q".to_string());
        assert!(item.has_been_pushed());
        assert_eq!(item.importance(), Some(Importance::High));
    }
}
