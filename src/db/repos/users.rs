use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateUser, Role, User, UserFilter},
};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a new user. `created_by` is the creating caller, recorded
    /// for the manager ownership rules.
    async fn create(&self, input: CreateUser, created_by: Option<Uuid>) -> DbResult<User>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<User>>;
    async fn get_by_username(&self, username: &str) -> DbResult<Option<User>>;
    async fn list(&self, filter: UserFilter) -> DbResult<Vec<User>>;
    async fn count_by_role(&self, role: Role) -> DbResult<i64>;
    /// Persist the full mutable state of an existing user.
    async fn save(&self, user: &User) -> DbResult<User>;
    async fn assign_group(&self, user_id: Uuid, group_id: Option<Uuid>) -> DbResult<()>;
    async fn assign_manager(&self, user_id: Uuid, manager_id: Option<Uuid>) -> DbResult<()>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
}
