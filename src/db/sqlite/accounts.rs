use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};
use uuid::Uuid;

use super::common::parse_uuid;
use crate::{
    db::{
        error::{DbError, DbResult},
        repos::AccountRepo,
    },
    models::{Account, AccountFilter, CreateAccount},
};

pub struct SqliteAccountRepo {
    pool: SqlitePool,
}

impl SqliteAccountRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn map_account(row: &SqliteRow) -> DbResult<Account> {
    let tags: Option<String> = row.get("tags");
    Ok(Account {
        id: parse_uuid(&row.get::<String, _>("id"))?,
        account_name: row.get("account_name"),
        nickname: row.get("nickname"),
        uid: row.get("uid"),
        region: row.get("region"),
        account_owner: row.get("account_owner"),
        contact_info: row.get("contact_info"),
        notes: row.get("notes"),
        responsible_person: row.get("responsible_person"),
        tags: tags.as_deref().map(serde_json::from_str).transpose()?,
        group_id: parse_uuid(&row.get::<String, _>("group_id"))?,
        created_by: parse_uuid(&row.get::<String, _>("created_by"))?,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

const ACCOUNT_COLS: &str = "id, account_name, nickname, uid, region, account_owner, \
     contact_info, notes, responsible_person, tags, group_id, created_by, \
     is_active, created_at, updated_at";

#[async_trait]
impl AccountRepo for SqliteAccountRepo {
    async fn create(&self, input: CreateAccount, created_by: Uuid) -> DbResult<Account> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();
        let tags = input.tags.as_ref().map(|t| t.to_string());

        sqlx::query(
            r#"
            INSERT INTO accounts (id, account_name, nickname, uid, region, account_owner,
                                  contact_info, notes, responsible_person, tags, group_id,
                                  created_by, is_active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&input.account_name)
        .bind(&input.nickname)
        .bind(&input.uid)
        .bind(&input.region)
        .bind(&input.account_owner)
        .bind(&input.contact_info)
        .bind(&input.notes)
        .bind(&input.responsible_person)
        .bind(tags)
        .bind(input.group_id.to_string())
        .bind(created_by.to_string())
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Account '{}' is already tracked", input.account_name),
            ),
            other => DbError::Sqlx(other),
        })?;

        self.get_by_id(id).await?.ok_or(DbError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE id = ?",
            ACCOUNT_COLS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_account).transpose()
    }

    async fn get_by_name(&self, account_name: &str) -> DbResult<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM accounts WHERE account_name = ?",
            ACCOUNT_COLS
        ))
        .bind(account_name)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_account).transpose()
    }

    async fn list(&self, filter: AccountFilter) -> DbResult<Vec<Account>> {
        let mut query = format!("SELECT {} FROM accounts WHERE 1=1", ACCOUNT_COLS);

        if let Some(group_ids) = &filter.group_ids {
            if group_ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; group_ids.len()].join(", ");
            query.push_str(&format!(" AND group_id IN ({})", placeholders));
        }
        if !filter.include_inactive {
            query.push_str(" AND is_active = 1");
        }
        query.push_str(" ORDER BY created_at, id");

        let mut q = sqlx::query(&query);
        if let Some(group_ids) = &filter.group_ids {
            for group_id in group_ids {
                q = q.bind(group_id.to_string());
            }
        }

        let rows = q.fetch_all(&self.pool).await?;
        rows.iter().map(map_account).collect()
    }

    async fn save(&self, account: &Account) -> DbResult<Account> {
        let tags = account.tags.as_ref().map(|t| t.to_string());

        let result = sqlx::query(
            r#"
            UPDATE accounts
            SET account_name = ?, nickname = ?, uid = ?, region = ?, account_owner = ?,
                contact_info = ?, notes = ?, responsible_person = ?, tags = ?,
                group_id = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&account.account_name)
        .bind(&account.nickname)
        .bind(&account.uid)
        .bind(&account.region)
        .bind(&account.account_owner)
        .bind(&account.contact_info)
        .bind(&account.notes)
        .bind(&account.responsible_person)
        .bind(tags)
        .bind(account.group_id.to_string())
        .bind(account.is_active)
        .bind(chrono::Utc::now())
        .bind(account.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => DbError::Conflict(
                format!("Account '{}' is already tracked", account.account_name),
            ),
            other => DbError::Sqlx(other),
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        self.get_by_id(account.id).await?.ok_or(DbError::NotFound)
    }

    async fn apply_profile_drift(
        &self,
        id: Uuid,
        nickname: &str,
        uid: &str,
        region: &str,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE accounts SET nickname = ?, uid = ?, region = ?, updated_at = ? WHERE id = ?",
        )
        .bind(nickname)
        .bind(uid)
        .bind(region)
        .bind(chrono::Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn transfer_to_group(&self, account_id: Uuid, group_id: Uuid) -> DbResult<()> {
        let result = sqlx::query("UPDATE accounts SET group_id = ?, updated_at = ? WHERE id = ?")
            .bind(group_id.to_string())
            .bind(chrono::Utc::now())
            .bind(account_id.to_string())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> DbResult<()> {
        // Snapshots go with the account. One transaction so a crash
        // cannot leave orphaned snapshot rows behind a deleted account.
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM snapshots WHERE account_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }
}
