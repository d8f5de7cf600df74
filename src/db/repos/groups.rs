use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    db::error::DbResult,
    models::{CreateGroup, Group},
};

#[async_trait]
pub trait GroupRepo: Send + Sync {
    async fn create(&self, input: CreateGroup, created_by: Uuid) -> DbResult<Group>;
    async fn get_by_id(&self, id: Uuid) -> DbResult<Option<Group>>;
    async fn list(&self, include_inactive: bool) -> DbResult<Vec<Group>>;
    /// Groups whose `managed_by` equals the given manager. This is the
    /// sole input to manager scope resolution, so it must always read
    /// the current pointer.
    async fn list_managed_by(&self, manager_id: Uuid) -> DbResult<Vec<Group>>;
    async fn save(&self, group: &Group) -> DbResult<Group>;
    /// Replace the group's manager pointer. Passing `None` leaves the
    /// group unmanaged.
    async fn assign_manager(&self, group_id: Uuid, manager_id: Option<Uuid>) -> DbResult<()>;
    async fn delete(&self, id: Uuid) -> DbResult<()>;
    async fn user_count(&self, group_id: Uuid) -> DbResult<i64>;
    async fn account_count(&self, group_id: Uuid) -> DbResult<i64>;
}
