use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{error::DbResult, repos::SnapshotRepo},
    models::{Snapshot, UpsertSnapshot},
};

pub struct SqliteSnapshotRepo {
    pool: SqlitePool,
}

impl SqliteSnapshotRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_snapshot(row: &SqliteRow) -> DbResult<Snapshot> {
    Ok(Snapshot {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        account_id: parse_uuid(&row.get::<String, _>("account_id"))?,
        date: row.get("date"),
        follower_count: row.get("follower_count"),
        following_count: row.get("following_count"),
        total_likes: row.get("total_likes"),
        video_count: row.get("video_count"),
        daily_uploads: row.get("daily_uploads"),
        recorded_at: row.get("recorded_at"),
        updated_at: row.get("updated_at"),
    })
}

const SNAPSHOT_COLS: &str = "id, account_id, date, follower_count, following_count, \
     total_likes, video_count, daily_uploads, recorded_at, updated_at";

#[async_trait]
impl SnapshotRepo for SqliteSnapshotRepo {
    async fn upsert(&self, input: UpsertSnapshot) -> DbResult<(Snapshot, bool)> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        // Single conditional write. `recorded_at` is only set on insert
        // and `updated_at` always takes the bound timestamp, so an
        // inserted row is recognizable by the two being equal.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO snapshots (id, account_id, date, follower_count, following_count,
                                   total_likes, video_count, daily_uploads,
                                   recorded_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(account_id, date) DO UPDATE SET
                follower_count = excluded.follower_count,
                following_count = excluded.following_count,
                total_likes = excluded.total_likes,
                video_count = excluded.video_count,
                daily_uploads = excluded.daily_uploads,
                updated_at = excluded.updated_at
            RETURNING {}
            "#,
            SNAPSHOT_COLS
        ))
        .bind(id.to_string())
        .bind(input.account_id.to_string())
        .bind(input.date)
        .bind(input.follower_count)
        .bind(input.following_count)
        .bind(input.total_likes)
        .bind(input.video_count)
        .bind(input.daily_uploads)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        let snapshot = map_snapshot(&row)?;
        let created = snapshot.recorded_at == snapshot.updated_at;
        Ok((snapshot, created))
    }

    async fn get_by_account_and_date(
        &self,
        account_id: Uuid,
        date: NaiveDate,
    ) -> DbResult<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM snapshots WHERE account_id = ? AND date = ?",
            SNAPSHOT_COLS
        ))
        .bind(account_id.to_string())
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_snapshot).transpose()
    }

    async fn latest_for_account(&self, account_id: Uuid) -> DbResult<Option<Snapshot>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM snapshots WHERE account_id = ? ORDER BY date DESC LIMIT 1",
            SNAPSHOT_COLS
        ))
        .bind(account_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_snapshot).transpose()
    }

    async fn series_for_account(
        &self,
        account_id: Uuid,
        since: NaiveDate,
    ) -> DbResult<Vec<Snapshot>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM snapshots WHERE account_id = ? AND date >= ? ORDER BY date ASC",
            SNAPSHOT_COLS
        ))
        .bind(account_id.to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_snapshot).collect()
    }

    async fn series_for_group(
        &self,
        group_id: Uuid,
        since: NaiveDate,
    ) -> DbResult<Vec<Snapshot>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM snapshots s
            WHERE s.account_id IN (SELECT id FROM accounts WHERE group_id = ?)
              AND s.date >= ?
            ORDER BY s.date ASC, s.account_id ASC
            "#,
            SNAPSHOT_COLS
                .split(", ")
                .map(|c| format!("s.{}", c))
                .collect::<Vec<_>>()
                .join(", ")
        ))
        .bind(group_id.to_string())
        .bind(since)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_snapshot).collect()
    }

    async fn latest_per_account_in_group(&self, group_id: Uuid) -> DbResult<Vec<Snapshot>> {
        let cols = SNAPSHOT_COLS
            .split(", ")
            .map(|c| format!("s.{}", c))
            .collect::<Vec<_>>()
            .join(", ");

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM snapshots s
            JOIN accounts a ON a.id = s.account_id
            WHERE a.group_id = ?
              AND s.date = (SELECT MAX(s2.date) FROM snapshots s2
                            WHERE s2.account_id = s.account_id)
            ORDER BY s.account_id ASC
            "#,
            cols
        ))
        .bind(group_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_snapshot).collect()
    }

    async fn count_for_account(&self, account_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM snapshots WHERE account_id = ?")
            .bind(account_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
