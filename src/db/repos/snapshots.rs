use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Snapshot, UpsertSnapshot},
};

#[async_trait]
pub trait SnapshotRepo: Send + Sync {
    /// Atomic insert-or-update keyed by (account, date).
    ///
    /// Concurrent upserts for the same key serialize at the database;
    /// the stored row is always exactly one caller's sample, never a
    /// merge. Returns the stored snapshot and whether a new row was
    /// inserted.
    async fn upsert(&self, input: UpsertSnapshot) -> DbResult<(Snapshot, bool)>;
    async fn get_by_account_and_date(
        &self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> DbResult<Option<Snapshot>>;
    /// Most recent snapshot for the account, if any.
    async fn latest_for_account(&self, account_id: Uuid) -> DbResult<Option<Snapshot>>;
    /// Snapshots for the account from `since` onward, ascending by date.
    async fn series_for_account(
        &self,
        account_id: Uuid,
        since: NaiveDate,
    ) -> DbResult<Vec<Snapshot>>;
    /// Snapshots across every account in the group from `since` onward,
    /// ordered by date then account id.
    async fn series_for_group(&self, group_id: Uuid, since: NaiveDate)
    -> DbResult<Vec<Snapshot>>;
    /// The latest snapshot of each account in the group.
    async fn latest_per_account_in_group(&self, group_id: Uuid) -> DbResult<Vec<Snapshot>>;
    async fn count_for_account(&self, account_id: Uuid) -> DbResult<i64>;
}
