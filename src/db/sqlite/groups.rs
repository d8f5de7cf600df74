use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_uuid, parse_uuid_opt};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::GroupRepo,
    },
    models::{CreateGroup, Group},
};

pub struct SqliteGroupRepo {
    pool: SqlitePool,
}

impl SqliteGroupRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_group(row: &SqliteRow) -> DbResult<Group> {
    Ok(Group {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        name: row.get("name"),
        description: row.get("description"),
        created_by: parse_uuid(&row.get::<String, _>("created_by"))?,
        managed_by: parse_uuid_opt(row.get("managed_by"))?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const GROUP_COLS: &str =
    "id, name, description, created_by, managed_by, is_active, created_at, updated_at";

#[async_trait]
impl GroupRepo for SqliteGroupRepo {
    async fn create(&self, input: CreateGroup, created_by: Uuid) -> DbResult<Group> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO groups (id, name, description, created_by, managed_by,
                                is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.name)
        .bind(&input.description)
        .bind(created_by.to_string())
        .bind(input.managed_by.map(|m| m.to_string()))
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>> {
        let row = sqlx::query(&format!("SELECT {} FROM groups WHERE id = ?", GROUP_COLS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_group).transpose()
    }

    async fn list(&self, include_inactive: bool) -> DbResult<Vec<Group>> {
        let mut query = format!("SELECT {} FROM groups", GROUP_COLS);
        if !include_inactive {
            query.push_str(" WHERE is_active = 1");
        }
        query.push_str(" ORDER BY created_at, id");

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(map_group).collect()
    }

    async fn list_managed_by(&self, manager_id: Uuid) -> DbResult<Vec<Group>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM groups WHERE managed_by = ? AND is_active = 1 ORDER BY created_at, id",
            GROUP_COLS
        ))
        .bind(manager_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(map_group).collect()
    }

    async fn save(&self, group: &Group) -> DbResult<Group> {
        let result = sqlx::query(
            r#"
            UPDATE groups
            SET name = ?, description = ?, managed_by = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.managed_by.map(|m| m.to_string()))
        .bind(group.is_active)
        .bind(chrono::Utc::now())
        .bind(group.id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(group.id).await?.ok_or(DbError::NotFound)
    }

    async fn assign_manager(&self, group_id: Uuid, manager_id: Option<Uuid>) -> DbResult<()> {
        let result = sqlx::query("UPDATE groups SET managed_by = ?, updated_at = ? WHERE id = ?")
            .bind(manager_id.map(|m| m.to_string()))
            .bind(chrono::Utc::now())
            .bind(group_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM groups WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn user_count(&self, group_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE group_id = ?")
            .bind(group_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    async fn account_count(&self, group_id: Uuid) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM accounts WHERE group_id = ?")
            .bind(group_id.to_string())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }
}
