use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{Account, AccountFilter, CreateAccount},
};

#[async_trait]
pub trait AccountRepo: Send + Sync {
    /// Insert a new account. Account names are unique; a duplicate
    /// produces a conflict error.
    async fn create(&self, input: CreateAccount, created_by: Uuid) -> DbResult<Account>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Account>>;
    async fn get_by_name(&self, account_name: &str) -> DbResult<Option<Account>>;
    async fn list(&self, filter: AccountFilter) -> DbResult<Vec<Account>>;
    /// Persist the full mutable state of an existing account.
    async fn save(&self, account: &Account) -> DbResult<Account>;
    /// Overwrite the slowly-changing profile fields observed upstream.
    /// System-driven; bypasses caller-facing update flows.
    async fn apply_profile_drift(
        &self,
        id: Uuid,
        nickname: &str,
        uid: &str,
        region: &str,
    ) -> DbResult<()>;
    /// Atomic single-pointer move of the account to another group.
    async fn transfer_to_group(&self, account_id: Uuid, group_id: Uuid) -> DbResult<()>;
    /// Delete the account and its snapshots in one transaction.
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
