use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    authz::{AccessGuard, AuthzError, OperationClass, Target},
    db::DbPool,
    models::{CreateGroup, Group, GroupOverview, Role, UpdateGroup, User},
    services::error::{EntityKind, ServiceError, ServiceResult, require},
};

/// Service layer for group administration.
#[derive(Clone)]
pub struct GroupService {
    db: Arc<DbPool>,
    guard: AccessGuard,
}

impl GroupService {
    pub fn new(db: Arc<DbPool>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    /// Create a new group. Groups come into existence unscoped, so
    /// creation is reserved to super admins.
    pub async fn create(&self, actor: &User, input: CreateGroup) -> ServiceResult<Group> {
        input.validate()?;

        if actor.role != Role::SuperAdmin {
            return Err(AuthzError::InsufficientRole {
                caller: actor.id,
                role: actor.role,
            }
            .into());
        }

        if let Some(manager_id) = input.managed_by {
            self.require_manager(manager_id).await?;
        }

        let group = self.db.groups().create(input, actor.id).await?;
        tracing::info!(group = %group.id, name = %group.name, "group created");
        Ok(group)
    }

    /// Fetch one group the actor may see.
    pub async fn get(&self, actor: &User, group_id: Uuid) -> ServiceResult<Group> {
        let group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Read)
            .await?;
        Ok(group)
    }

    /// List the groups in the actor's scope, decorated with counts.
    pub async fn list(&self, actor: &User) -> ServiceResult<Vec<GroupOverview>> {
        let scope = self
            .guard
            .resolver()
            .resolve(actor, OperationClass::Read)
            .await?;
        let groups = self.guard.resolver().groups_in_scope(&scope).await?;

        let mut overviews = Vec::with_capacity(groups.len());
        for group in groups {
            let user_count = self.db.groups().user_count(group.id).await?;
            let account_count = self.db.groups().account_count(group.id).await?;
            overviews.push(GroupOverview {
                group,
                user_count,
                account_count,
            });
        }
        Ok(overviews)
    }

    /// Apply a partial update to a group.
    pub async fn update(
        &self,
        actor: &User,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> ServiceResult<Group> {
        input.validate()?;

        let mut group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Write)
            .await?;

        if let Some(name) = input.name {
            group.name = name;
        }
        if let Some(description) = input.description {
            group.description = description;
        }
        if let Some(is_active) = input.is_active {
            group.is_active = is_active;
        }

        Ok(self.db.groups().save(&group).await?)
    }

    /// Replace the group's manager. The previous manager loses scope at
    /// their next authorization check.
    pub async fn assign_manager(
        &self,
        actor: &User,
        group_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        let group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Admin)
            .await?;

        if let Some(manager_id) = manager_id {
            self.require_manager(manager_id).await?;
        }

        self.db.groups().assign_manager(group_id, manager_id).await?;
        tracing::info!(
            group = %group_id,
            manager = ?manager_id,
            previous = ?group.managed_by,
            "group manager reassigned"
        );
        Ok(())
    }

    /// Delete a group. Accounts must be moved out first; deleting a
    /// group under live accounts would leave them pointing nowhere.
    pub async fn delete(&self, actor: &User, group_id: Uuid) -> ServiceResult<()> {
        let group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Admin)
            .await?;

        let accounts = self.db.groups().account_count(group_id).await?;
        if accounts > 0 {
            return Err(ServiceError::Conflict(format!(
                "group {} still owns {} accounts",
                group_id, accounts
            )));
        }

        self.db.groups().delete(group_id).await?;
        tracing::info!(group = %group_id, name = %group.name, "group deleted");
        Ok(())
    }

    async fn require_manager(&self, manager_id: Uuid) -> ServiceResult<()> {
        let manager = require(
            self.db.users().get_by_id(manager_id).await?,
            EntityKind::User,
            manager_id,
        )?;
        if manager.role != Role::Manager {
            return Err(AuthzError::HierarchyViolation { user: manager_id }.into());
        }
        Ok(())
    }
}
