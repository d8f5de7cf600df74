//! DbPool construction from configuration.

use tempfile::tempdir;

use crate::{config::DatabaseConfig, db::DbPool};

#[tokio::test]
async fn from_config_creates_and_migrates_file_database() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("fleet.db");

    let config = DatabaseConfig {
        path: path.to_string_lossy().into_owned(),
        ..Default::default()
    };

    let db = DbPool::from_config(&config).await.expect("pool should open");
    db.run_migrations().await.expect("migrations should apply");
    db.health_check().await.expect("database should respond");

    // The seeded root administrator proves the schema landed.
    let root = db
        .users()
        .get_by_id(crate::models::ROOT_USER_ID)
        .await
        .unwrap();
    assert!(root.is_some());
    assert!(path.exists());
}
