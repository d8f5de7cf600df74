use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::{parse_uuid, parse_uuid_opt};
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::UserRepo,
    },
    models::{CreateUser, Role, User, UserFilter},
};

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_user(row: &SqliteRow) -> DbResult<User> {
    let role: String = row.get("role");
    Ok(User {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        username: row.get("username"),
        role: Role::from_str(&role)
            .ok_or_else(|| DbError::Internal(format!("Invalid role in database: {}", role)))?,
        group_id: parse_uuid_opt(row.get("group_id"))?,
        created_by: parse_uuid_opt(row.get("created_by"))?,
        managed_by: parse_uuid_opt(row.get("managed_by"))?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const USER_COLS: &str =
    "id, username, role, group_id, created_by, managed_by, is_active, created_at, updated_at";

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, input: CreateUser, created_by: Option<Uuid>) -> DbResult<User> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO users (id, username, role, group_id, created_by, managed_by,
                               is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.username)
        .bind(input.role.as_str())
        .bind(input.group_id.map(|g| g.to_string()))
        .bind(created_by.map(|c| c.to_string()))
        .bind(input.managed_by.map(|m| m.to_string()))
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("Username '{}' is already taken", input.username))
            }
            other => DbError::Sqlx(other),
        })?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = ?",
            USER_COLS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_user).transpose()
    }

    async fn list(&self, filter: UserFilter) -> DbResult<Vec<User>> {
        let mut query = format!("SELECT {} FROM users WHERE 1=1", USER_COLS);
        if filter.role.is_some() {
            query.push_str(" AND role = ?");
        }
        if filter.group_id.is_some() {
            query.push_str(" AND group_id = ?");
        }
        if filter.managed_by.is_some() {
            query.push_str(" AND managed_by = ?");
        }
        if !filter.include_inactive {
            query.push_str(" AND is_active = 1");
        }
        query.push_str(" ORDER BY created_at, id");

        let mut q = sqlx::query(&query);
        if let Some(role) = filter.role {
            q = q.bind(role.as_str());
        }
        if let Some(group_id) = filter.group_id {
            q = q.bind(group_id.to_string());
        }
        if let Some(managed_by) = filter.managed_by {
            q = q.bind(managed_by.to_string());
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(map_user).collect()
    }

    async fn count_by_role(&self, role: Role) -> DbResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM users WHERE role = ?")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("count"))
    }

    async fn save(&self, user: &User) -> DbResult<User> {
        let now = chrono::Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE users
            SET username = ?, role = ?, group_id = ?, managed_by = ?,
                is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&user.username)
        .bind(user.role.as_str())
        .bind(user.group_id.map(|g| g.to_string()))
        .bind(user.managed_by.map(|m| m.to_string()))
        .bind(user.is_active)
        .bind(now)
        .bind(user.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                DbError::Conflict(format!("Username '{}' is already taken", user.username))
            }
            other => DbError::Sqlx(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(user.id).await?.ok_or(DbError::NotFound)
    }

    async fn assign_group(&self, user_id: Uuid, group_id: Option<Uuid>) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET group_id = ?, updated_at = ? WHERE id = ?")
            .bind(group_id.map(|g| g.to_string()))
            .bind(chrono::Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn assign_manager(&self, user_id: Uuid, manager_id: Option<Uuid>) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET managed_by = ?, updated_at = ? WHERE id = ?")
            .bind(manager_id.map(|m| m.to_string()))
            .bind(chrono::Utc::now())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}
