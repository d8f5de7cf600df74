use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    authz::{AccessGuard, OperationClass, Target},
    db::DbPool,
    models::{Account, AccountFilter, CreateAccount, Snapshot, UpdateAccount, User},
    services::error::{EntityKind, ServiceError, ServiceResult, require},
};

/// Service layer for tracked account management.
#[derive(Clone)]
pub struct AccountService {
    db: Arc<DbPool>,
    guard: AccessGuard,
}

impl AccountService {
    pub fn new(db: Arc<DbPool>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    /// Register a new account under a group the actor can write to.
    pub async fn create(&self, actor: &User, input: CreateAccount) -> ServiceResult<Account> {
        input.validate()?;

        let group = require(
            self.db.groups().get_by_id(input.group_id).await?,
            EntityKind::Group,
            input.group_id,
        )?;
        // An inactive group is as good as deleted for placement.
        if !group.is_active {
            return Err(ServiceError::NotFound {
                kind: EntityKind::Group,
                id: group.id,
            });
        }

        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Write)
            .await?;

        let account = self.db.accounts().create(input, actor.id).await?;
        tracing::info!(account = %account.id, name = %account.account_name, group = %group.id, "account registered");
        Ok(account)
    }

    /// Fetch an account with its latest snapshot.
    pub async fn get(
        &self,
        actor: &User,
        account_id: Uuid,
    ) -> ServiceResult<(Account, Option<Snapshot>)> {
        let account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        self.guard
            .authorize(actor, Target::Account(&account), OperationClass::Read)
            .await?;

        let latest = self.db.snapshots().latest_for_account(account_id).await?;
        Ok((account, latest))
    }

    /// List the accounts inside the actor's scope.
    pub async fn list(&self, actor: &User) -> ServiceResult<Vec<Account>> {
        let scope = self
            .guard
            .resolver()
            .resolve(actor, OperationClass::Read)
            .await?;

        let filter = AccountFilter {
            group_ids: scope.as_group_filter(),
            ..Default::default()
        };
        Ok(self.db.accounts().list(filter).await?)
    }

    /// Apply a partial update. Changing the owning group requires write
    /// scope over the destination as well.
    pub async fn update(
        &self,
        actor: &User,
        account_id: Uuid,
        input: UpdateAccount,
    ) -> ServiceResult<Account> {
        input.validate()?;

        let mut account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        self.guard
            .authorize(actor, Target::Account(&account), OperationClass::Write)
            .await?;

        if let Some(destination) = input.group_id
            && destination != account.group_id
        {
            let group = require(
                self.db.groups().get_by_id(destination).await?,
                EntityKind::Group,
                destination,
            )?;
            self.guard
                .authorize(actor, Target::Group(&group), OperationClass::Write)
                .await?;
            account.group_id = destination;
        }

        if let Some(account_name) = input.account_name {
            account.account_name = account_name;
        }
        if let Some(nickname) = input.nickname {
            account.nickname = nickname;
        }
        if let Some(uid) = input.uid {
            account.uid = uid;
        }
        if let Some(region) = input.region {
            account.region = region;
        }
        if let Some(account_owner) = input.account_owner {
            account.account_owner = account_owner;
        }
        if let Some(contact_info) = input.contact_info {
            account.contact_info = contact_info;
        }
        if let Some(notes) = input.notes {
            account.notes = notes;
        }
        if let Some(responsible_person) = input.responsible_person {
            account.responsible_person = responsible_person;
        }
        if let Some(tags) = input.tags {
            account.tags = Some(tags);
        }
        if let Some(is_active) = input.is_active {
            account.is_active = is_active;
        }

        Ok(self.db.accounts().save(&account).await?)
    }

    /// Move an account to another group in one atomic pointer change.
    pub async fn transfer(
        &self,
        actor: &User,
        account_id: Uuid,
        destination_group: Uuid,
    ) -> ServiceResult<()> {
        let account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        self.guard
            .authorize(actor, Target::Account(&account), OperationClass::Write)
            .await?;

        let group = require(
            self.db.groups().get_by_id(destination_group).await?,
            EntityKind::Group,
            destination_group,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Write)
            .await?;

        self.db
            .accounts()
            .transfer_to_group(account_id, destination_group)
            .await?;
        tracing::info!(account = %account_id, from = %account.group_id, to = %destination_group, "account transferred");
        Ok(())
    }

    /// Delete an account and its snapshot history.
    pub async fn delete(&self, actor: &User, account_id: Uuid) -> ServiceResult<()> {
        let account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        self.guard
            .authorize(actor, Target::Account(&account), OperationClass::Write)
            .await?;

        self.db.accounts().delete(account_id).await?;
        tracing::info!(account = %account_id, name = %account.account_name, "account deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authz::AuthzError,
        db::tests::harness::{seed, test_db},
        models::Role,
    };

    fn service(db: &Arc<DbPool>) -> AccountService {
        AccountService::new(db.clone(), AccessGuard::new(db.clone()))
    }

    fn create_input(name: &str, group_id: Uuid) -> CreateAccount {
        CreateAccount {
            account_name: name.to_string(),
            nickname: String::new(),
            uid: String::new(),
            region: String::new(),
            account_owner: String::new(),
            contact_info: String::new(),
            notes: String::new(),
            responsible_person: String::new(),
            tags: None,
            group_id,
        }
    }

    #[tokio::test]
    async fn operator_creates_only_in_own_group() {
        let db = test_db().await;
        let own = seed::group(&db, "own", None).await;
        let other = seed::group(&db, "other", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let operator =
            seed::user(&db, "operator", Role::Operator, Some(own.id), Some(manager.id)).await;

        let accounts = service(&db);

        accounts
            .create(&operator, create_input("inside", own.id))
            .await
            .expect("in-group creation should succeed");

        let err = accounts
            .create(&operator, create_input("outside", other.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Denied(AuthzError::OutOfScope { .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_name_is_conflict() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;
        let group = seed::group(&db, "alpha", None).await;
        seed::account(&db, "creator_one", group.id).await;

        let err = service(&db)
            .create(&admin, create_input("creator_one", group.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let ghost = Uuid::new_v4();
        let err = service(&db)
            .create(&admin, create_input("acct", ghost))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::NotFound {
                kind: EntityKind::Group,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn listing_is_scope_filtered() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let mine = seed::group(&db, "mine", Some(manager.id)).await;
        let other = seed::group(&db, "other", None).await;
        seed::account(&db, "visible", mine.id).await;
        seed::account(&db, "hidden", other.id).await;

        let listed = service(&db).list(&manager).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].account_name, "visible");
    }

    #[tokio::test]
    async fn group_change_requires_destination_scope() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let mine = seed::group(&db, "mine", Some(manager.id)).await;
        let foreign = seed::group(&db, "foreign", None).await;
        let account = seed::account(&db, "acct", mine.id).await;

        let accounts = service(&db);
        let err = accounts
            .update(
                &manager,
                account.id,
                UpdateAccount {
                    group_id: Some(foreign.id),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Denied(AuthzError::OutOfScope { .. })
        ));

        // Unchanged fields update fine inside scope.
        let updated = accounts
            .update(
                &manager,
                account.id,
                UpdateAccount {
                    notes: Some("priority".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.notes, "priority");
    }

    #[tokio::test]
    async fn get_returns_latest_snapshot() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;
        let group = seed::group(&db, "alpha", None).await;
        let account = seed::account(&db, "acct", group.id).await;
        let d1 = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let d2 = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        seed::snapshot(&db, account.id, d1, 100, 1000).await;
        seed::snapshot(&db, account.id, d2, 120, 1200).await;

        let (_, latest) = service(&db).get(&admin, account.id).await.unwrap();
        let latest = latest.expect("latest snapshot should be present");
        assert_eq!(latest.date, d2);
        assert_eq!(latest.follower_count, 120);
    }
}
