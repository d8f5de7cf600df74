use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One daily metric snapshot for an account.
///
/// At most one snapshot exists per (account, date) pair. A same-day
/// re-ingest overwrites the value fields in place; snapshots for past
/// dates are never touched again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub account_id: Uuid,
    /// UTC calendar day the sample belongs to.
    pub date: NaiveDate,
    pub follower_count: i64,
    pub following_count: i64,
    pub total_likes: i64,
    pub video_count: i64,
    pub daily_uploads: i64,
    /// When the first sample for this day was recorded.
    pub recorded_at: DateTime<Utc>,
    /// When the value fields were last written.
    pub updated_at: DateTime<Utc>,
}

/// Input for the atomic insert-or-update of a snapshot row.
#[derive(Debug, Clone)]
pub struct UpsertSnapshot {
    pub account_id: Uuid,
    pub date: NaiveDate,
    pub follower_count: i64,
    pub following_count: i64,
    pub total_likes: i64,
    pub video_count: i64,
    pub daily_uploads: i64,
}

/// Outcome of ingesting one metric sample.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub snapshot: Snapshot,
    /// Whether a new snapshot row was inserted (as opposed to a
    /// same-day overwrite).
    pub created: bool,
    /// Whether slowly-changing profile fields drifted and the account
    /// record was updated as a side effect.
    pub profile_updated: bool,
}
