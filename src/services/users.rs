use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::{
    authz::{AccessGuard, AuthzError, OperationClass, Target},
    db::DbPool,
    models::{CreateUser, Role, UpdateUser, User, UserFilter},
    services::error::{EntityKind, ServiceError, ServiceResult, require},
};

/// Service layer for user administration.
///
/// Creation and mutation follow the role hierarchy: super admins manage
/// everyone, managers manage the operators they created inside their
/// managed groups, operators manage only their own record.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DbPool>,
    guard: AccessGuard,
}

impl UserService {
    pub fn new(db: Arc<DbPool>, guard: AccessGuard) -> Self {
        Self { db, guard }
    }

    /// Create a new user on behalf of `actor`.
    pub async fn create(&self, actor: &User, input: CreateUser) -> ServiceResult<User> {
        input.validate()?;

        match actor.role {
            Role::SuperAdmin => {}
            Role::Manager => {
                // Managers may only staff their groups with operators.
                if input.role != Role::Operator {
                    return Err(AuthzError::InsufficientRole {
                        caller: actor.id,
                        role: actor.role,
                    }
                    .into());
                }
            }
            Role::Operator => {
                return Err(AuthzError::InsufficientRole {
                    caller: actor.id,
                    role: actor.role,
                }
                .into());
            }
        }

        match input.role {
            Role::Operator => {
                if input.group_id.is_none() {
                    return Err(ServiceError::Validation(
                        "operators must belong to a group".into(),
                    ));
                }
                if input.managed_by.is_none() {
                    return Err(ServiceError::Validation(
                        "operators must have a manager".into(),
                    ));
                }
            }
            Role::Manager | Role::SuperAdmin => {
                if input.managed_by.is_some() {
                    return Err(ServiceError::Validation(
                        "only operators can have a manager".into(),
                    ));
                }
            }
        }

        // The target group must exist; a manager additionally needs
        // write scope over it to place an operator there.
        if let Some(group_id) = input.group_id {
            let group = require(
                self.db.groups().get_by_id(group_id).await?,
                EntityKind::Group,
                group_id,
            )?;
            if actor.role == Role::Manager {
                self.guard
                    .authorize(actor, Target::Group(&group), OperationClass::Write)
                    .await?;
            }
        }

        let user = self.db.users().create(input, Some(actor.id)).await?;
        tracing::info!(user = %user.id, username = %user.username, role = %user.role, "user created");
        Ok(user)
    }

    /// Fetch a user the actor is allowed to see.
    pub async fn get(&self, actor: &User, user_id: Uuid) -> ServiceResult<User> {
        let user = require(
            self.db.users().get_by_id(user_id).await?,
            EntityKind::User,
            user_id,
        )?;
        self.guard
            .authorize(actor, Target::User(&user), OperationClass::Read)
            .await?;
        Ok(user)
    }

    /// List users visible to the actor. Managers see the users they
    /// administer, operators see themselves.
    pub async fn list(&self, actor: &User, mut filter: UserFilter) -> ServiceResult<Vec<User>> {
        match actor.role {
            Role::SuperAdmin => {}
            Role::Manager => filter.managed_by = Some(actor.id),
            Role::Operator => {
                return Ok(self
                    .db
                    .users()
                    .get_by_id(actor.id)
                    .await?
                    .into_iter()
                    .collect());
            }
        }
        Ok(self.db.users().list(filter).await?)
    }

    /// Apply a partial update to a user record.
    pub async fn update(&self, actor: &User, user_id: Uuid, input: UpdateUser) -> ServiceResult<User> {
        input.validate()?;

        let mut user = require(
            self.db.users().get_by_id(user_id).await?,
            EntityKind::User,
            user_id,
        )?;

        // Role changes are reserved to super admins outright.
        if input.role.is_some() && actor.role != Role::SuperAdmin {
            return Err(AuthzError::InsufficientRole {
                caller: actor.id,
                role: actor.role,
            }
            .into());
        }

        // Role and active-flag changes are administrative; everything
        // else is a plain write (including self-service).
        let class = if input.role.is_some() || input.is_active.is_some() {
            OperationClass::Admin
        } else {
            OperationClass::Write
        };
        self.guard
            .authorize(actor, Target::User(&user), class)
            .await?;

        if let Some(username) = input.username {
            user.username = username;
        }
        if let Some(role) = input.role {
            user.role = role;
            // Leaving the operator role dissolves the manager link.
            if role != Role::Operator {
                user.managed_by = None;
            }
        }
        if let Some(group_id) = input.group_id {
            require(
                self.db.groups().get_by_id(group_id).await?,
                EntityKind::Group,
                group_id,
            )?;
            user.group_id = Some(group_id);
        }
        if let Some(is_active) = input.is_active {
            user.is_active = is_active;
        }

        let saved = self.db.users().save(&user).await?;
        tracing::info!(user = %saved.id, "user updated");
        Ok(saved)
    }

    /// Delete a user record.
    pub async fn delete(&self, actor: &User, user_id: Uuid) -> ServiceResult<()> {
        let user = require(
            self.db.users().get_by_id(user_id).await?,
            EntityKind::User,
            user_id,
        )?;

        self.guard.authorize_user_deletion(actor, &user).await?;

        self.db.users().delete(user_id).await?;
        tracing::info!(user = %user_id, username = %user.username, "user deleted");
        Ok(())
    }

    /// Move a user into a group (or out of all groups).
    pub async fn assign_group(
        &self,
        actor: &User,
        user_id: Uuid,
        group_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        let user = require(
            self.db.users().get_by_id(user_id).await?,
            EntityKind::User,
            user_id,
        )?;
        self.guard
            .authorize(actor, Target::User(&user), OperationClass::Write)
            .await?;

        if let Some(group_id) = group_id {
            let group = require(
                self.db.groups().get_by_id(group_id).await?,
                EntityKind::Group,
                group_id,
            )?;
            self.guard
                .authorize(actor, Target::Group(&group), OperationClass::Write)
                .await?;
        }

        Ok(self.db.users().assign_group(user_id, group_id).await?)
    }

    /// Point an operator at a new manager. Administrative, and the
    /// referenced manager must actually hold the manager role.
    pub async fn assign_manager(
        &self,
        actor: &User,
        user_id: Uuid,
        manager_id: Option<Uuid>,
    ) -> ServiceResult<()> {
        if actor.role != Role::SuperAdmin {
            return Err(AuthzError::InsufficientRole {
                caller: actor.id,
                role: actor.role,
            }
            .into());
        }

        let user = require(
            self.db.users().get_by_id(user_id).await?,
            EntityKind::User,
            user_id,
        )?;
        if user.role != Role::Operator {
            return Err(AuthzError::HierarchyViolation { user: user.id }.into());
        }

        if let Some(manager_id) = manager_id {
            if manager_id == user_id {
                return Err(AuthzError::SelfReferenceForbidden { user: user_id }.into());
            }
            let manager = require(
                self.db.users().get_by_id(manager_id).await?,
                EntityKind::User,
                manager_id,
            )?;
            if manager.role != Role::Manager {
                return Err(AuthzError::HierarchyViolation { user: manager_id }.into());
            }
        }

        Ok(self.db.users().assign_manager(user_id, manager_id).await?)
    }
}
