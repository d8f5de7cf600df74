//! GroupRepo tests against in-memory SQLite.

use super::harness::{seed, test_db};
use crate::{db::DbError, models::Role};

#[tokio::test]
async fn create_and_get_group() {
    let db = test_db().await;

    let group = seed::group(&db, "alpha", None).await;
    assert_eq!(group.name, "alpha");
    assert!(group.managed_by.is_none());
    assert!(group.is_active);

    let fetched = db
        .groups()
        .get_by_id(group.id)
        .await
        .unwrap()
        .expect("group should exist");
    assert_eq!(fetched.id, group.id);
}

#[tokio::test]
async fn list_managed_by_tracks_current_pointer() {
    let db = test_db().await;
    let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
    let rival = seed::user(&db, "rival", Role::Manager, None, None).await;
    let g1 = seed::group(&db, "alpha", Some(manager.id)).await;
    let g2 = seed::group(&db, "beta", Some(manager.id)).await;
    seed::group(&db, "gamma", Some(rival.id)).await;

    let managed = db.groups().list_managed_by(manager.id).await.unwrap();
    assert_eq!(managed.len(), 2);
    assert!(managed.iter().any(|g| g.id == g1.id));
    assert!(managed.iter().any(|g| g.id == g2.id));

    // Reassignment moves the group out of the old manager's listing.
    db.groups().assign_manager(g1.id, Some(rival.id)).await.unwrap();
    let managed = db.groups().list_managed_by(manager.id).await.unwrap();
    assert_eq!(managed.len(), 1);
    assert_eq!(managed[0].id, g2.id);
}

#[tokio::test]
async fn assign_manager_replaces_and_clears() {
    let db = test_db().await;
    let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
    let group = seed::group(&db, "alpha", None).await;

    db.groups()
        .assign_manager(group.id, Some(manager.id))
        .await
        .unwrap();
    let fetched = db.groups().get_by_id(group.id).await.unwrap().unwrap();
    assert_eq!(fetched.managed_by, Some(manager.id));

    db.groups().assign_manager(group.id, None).await.unwrap();
    let fetched = db.groups().get_by_id(group.id).await.unwrap().unwrap();
    assert!(fetched.managed_by.is_none());
}

#[tokio::test]
async fn inactive_groups_hidden_from_default_listing() {
    let db = test_db().await;
    let mut group = seed::group(&db, "alpha", None).await;
    seed::group(&db, "beta", None).await;

    group.is_active = false;
    db.groups().save(&group).await.unwrap();

    let active = db.groups().list(false).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].name, "beta");

    let all = db.groups().list(true).await.unwrap();
    assert_eq!(all.len(), 2);
}

#[tokio::test]
async fn membership_counts() {
    let db = test_db().await;
    let group = seed::group(&db, "alpha", None).await;
    let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
    seed::user(&db, "op-one", Role::Operator, Some(group.id), Some(manager.id)).await;
    seed::user(&db, "op-two", Role::Operator, Some(group.id), Some(manager.id)).await;
    seed::account(&db, "acct-one", group.id).await;

    assert_eq!(db.groups().user_count(group.id).await.unwrap(), 2);
    assert_eq!(db.groups().account_count(group.id).await.unwrap(), 1);
}

#[tokio::test]
async fn delete_missing_group_is_not_found() {
    let db = test_db().await;
    let group = seed::group(&db, "alpha", None).await;

    db.groups().delete(group.id).await.unwrap();
    let err = db.groups().delete(group.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}
