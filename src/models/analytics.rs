use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use super::Snapshot;

/// Per-account trend over a trailing window, projected into parallel
/// series for charting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendSeries {
    pub dates: Vec<NaiveDate>,
    pub follower_counts: Vec<i64>,
    pub like_counts: Vec<i64>,
    pub video_counts: Vec<i64>,
    pub upload_counts: Vec<i64>,
}

impl TrendSeries {
    /// Build the parallel series from date-ordered snapshots.
    pub fn from_snapshots(snapshots: &[Snapshot]) -> Self {
        let mut series = Self {
            dates: Vec::with_capacity(snapshots.len()),
            follower_counts: Vec::with_capacity(snapshots.len()),
            like_counts: Vec::with_capacity(snapshots.len()),
            video_counts: Vec::with_capacity(snapshots.len()),
            upload_counts: Vec::with_capacity(snapshots.len()),
        };
        for snapshot in snapshots {
            series.dates.push(snapshot.date);
            series.follower_counts.push(snapshot.follower_count);
            series.like_counts.push(snapshot.total_likes);
            series.video_counts.push(snapshot.video_count);
            series.upload_counts.push(snapshot.daily_uploads);
        }
        series
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Growth of one metric over a window: first value, last value, and the
/// rate `(last - first) / max(first, 1)`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct MetricGrowth {
    pub first: i64,
    pub last: i64,
    pub rate: f64,
}

impl MetricGrowth {
    /// The denominator is floor-clamped to 1 so a zero baseline yields
    /// a finite rate instead of an error.
    pub fn over(first: i64, last: i64) -> Self {
        let rate = (last - first) as f64 / first.max(1) as f64;
        Self { first, last, rate }
    }
}

/// One account's entry in a cross-account comparison.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonEntry {
    pub account_id: Uuid,
    pub account_name: String,
    pub trend: TrendSeries,
    pub followers: MetricGrowth,
    pub likes: MetricGrowth,
    pub videos: MetricGrowth,
}

/// Cross-account comparison over a shared trailing window.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Comparison {
    pub window_days: i64,
    pub entries: Vec<ComparisonEntry>,
}

/// One row of a group-wide trend: every snapshot of every account in
/// the group within the window, ordered by date then account.
#[derive(Debug, Clone, Serialize)]
pub struct GroupTrend {
    pub group_id: Uuid,
    pub window_days: i64,
    pub snapshots: Vec<Snapshot>,
}

/// Aggregate figures for one group on the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct GroupRollup {
    pub group_id: Uuid,
    pub group_name: String,
    pub account_count: i64,
    pub total_followers: i64,
    pub total_likes: i64,
    pub total_videos: i64,
    /// Follower growth comparing the latest snapshots to those a fixed
    /// number of days prior. Zero when no history is available.
    pub growth_rate: f64,
}

/// One entry of the top-accounts-by-followers ranking.
#[derive(Debug, Clone, Serialize)]
pub struct TopAccount {
    pub account_id: Uuid,
    pub account_name: String,
    pub group_id: Uuid,
    pub follower_count: i64,
}

/// Caller-scoped dashboard summary: per-group rollups, global totals,
/// and the top accounts ranking.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardSummary {
    pub total_accounts: i64,
    pub total_followers: i64,
    pub total_likes: i64,
    pub total_videos: i64,
    pub groups: Vec<GroupRollup>,
    pub top_accounts: Vec<TopAccount>,
}
