//! Test harness for database-backed tests.
//!
//! Creates in-memory SQLite databases with real migrations, plus
//! seeding shortcuts for the entity graph.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::db::DbPool;

/// Create an in-memory SQLite pool for testing.
///
/// A single connection keeps the in-memory database alive and shared
/// for the lifetime of the pool.
pub async fn create_sqlite_pool() -> SqlitePool {
    sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory SQLite pool")
}

/// Create a migrated in-memory entity store.
pub async fn test_db() -> Arc<DbPool> {
    let pool = create_sqlite_pool().await;
    let db = DbPool::from_sqlite(pool);
    db.run_migrations()
        .await
        .expect("Failed to run migrations");
    Arc::new(db)
}

/// Seeding shortcuts. Each helper creates a valid entity through the
/// repositories and panics on failure, keeping test bodies focused on
/// the behavior under test.
pub mod seed {
    use std::sync::Arc;

    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::{
        db::DbPool,
        models::{
            Account, CreateAccount, CreateGroup, CreateUser, Group, ROOT_USER_ID, Role, Snapshot,
            UpsertSnapshot, User,
        },
    };

    pub async fn user(
        db: &Arc<DbPool>,
        username: &str,
        role: Role,
        group_id: Option<Uuid>,
        managed_by: Option<Uuid>,
    ) -> User {
        db.users()
            .create(
                CreateUser {
                    username: username.to_string(),
                    role,
                    group_id,
                    managed_by,
                },
                Some(ROOT_USER_ID),
            )
            .await
            .expect("Failed to seed user")
    }

    pub async fn user_created_by(
        db: &Arc<DbPool>,
        username: &str,
        role: Role,
        group_id: Option<Uuid>,
        managed_by: Option<Uuid>,
        created_by: Uuid,
    ) -> User {
        db.users()
            .create(
                CreateUser {
                    username: username.to_string(),
                    role,
                    group_id,
                    managed_by,
                },
                Some(created_by),
            )
            .await
            .expect("Failed to seed user")
    }

    pub async fn group(db: &Arc<DbPool>, name: &str, managed_by: Option<Uuid>) -> Group {
        db.groups()
            .create(
                CreateGroup {
                    name: name.to_string(),
                    description: format!("Group {}", name),
                    managed_by,
                },
                ROOT_USER_ID,
            )
            .await
            .expect("Failed to seed group")
    }

    pub async fn account(db: &Arc<DbPool>, account_name: &str, group_id: Uuid) -> Account {
        db.accounts()
            .create(
                CreateAccount {
                    account_name: account_name.to_string(),
                    nickname: String::new(),
                    uid: String::new(),
                    region: String::new(),
                    account_owner: String::new(),
                    contact_info: String::new(),
                    notes: String::new(),
                    responsible_person: String::new(),
                    tags: None,
                    group_id,
                },
                ROOT_USER_ID,
            )
            .await
            .expect("Failed to seed account")
    }

    pub async fn snapshot(
        db: &Arc<DbPool>,
        account_id: Uuid,
        date: NaiveDate,
        followers: i64,
        likes: i64,
    ) -> Snapshot {
        let (snapshot, _) = db
            .snapshots()
            .upsert(UpsertSnapshot {
                account_id,
                date,
                follower_count: followers,
                following_count: followers / 10,
                total_likes: likes,
                video_count: 10,
                daily_uploads: 1,
            })
            .await
            .expect("Failed to seed snapshot");
        snapshot
    }
}
