// src/domain/rank_history.rs
//
// Append-only rank observations and the trend summary derived from them.
// Lower rank numbers are better: moving from 5 to 2 is "rising".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One immutable (item, cycle) rank observation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankHistoryEntry {
    pub id: i64,
    pub news_item_id: i64,
    pub rank: u32,
    pub crawl_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Which part of an item's history a trend query covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendWindow {
    All,
    /// Entries with crawl_time >= the given time
    Since(DateTime<Utc>),
    /// The most recent N entries
    LastN(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Steady,
    /// Fewer than two points
    Single,
}

/// Ordered rank points of one item plus a summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankTrend {
    pub news_item_id: i64,
    /// Ascending by crawl_time
    pub points: Vec<RankHistoryEntry>,
    pub best_rank: Option<u32>,
    pub worst_rank: Option<u32>,
    pub appearances: usize,
    pub direction: TrendDirection,
}

impl RankTrend {
    /// Summarize points already sorted by crawl_time.
    pub fn from_points(news_item_id: i64, points: Vec<RankHistoryEntry>) -> Self {
        let best_rank = points.iter().map(|p| p.rank).min();
        let worst_rank = points.iter().map(|p| p.rank).max();

        let direction = match (points.first(), points.last()) {
            (Some(first), Some(last)) if points.len() > 1 => {
                if last.rank < first.rank {
                    TrendDirection::Rising
                } else if last.rank > first.rank {
                    TrendDirection::Falling
                } else {
                    TrendDirection::Steady
                }
            }
            _ => TrendDirection::Single,
        };

        Self {
            news_item_id,
            appearances: points.len(),
            points,
            best_rank,
            worst_rank,
            direction,
        }
    }

    pub fn ranks(&self) -> Vec<u32> {
        self.points.iter().map(|p| p.rank).collect()
    }
}
