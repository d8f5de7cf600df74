use std::sync::Arc;

use crate::{
    authz::{AuthzError, OperationClass, ScopeResolver, ScopeSet},
    db::DbPool,
    models::{Account, Group, Role, User},
};

/// The entity an operation is aimed at.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Group(&'a Group),
    Account(&'a Account),
    User(&'a User),
}

impl Target<'_> {
    /// The group whose scope governs this target, when there is one.
    /// Group targets use their own id; accounts their owning group;
    /// users their membership group.
    fn effective_group(&self) -> Option<uuid::Uuid> {
        match self {
            Target::Group(group) => Some(group.id),
            Target::Account(account) => Some(account.group_id),
            Target::User(user) => user.group_id,
        }
    }
}

/// Wraps single-entity operations with a scope check.
///
/// Group and account targets are pure scope membership checks. User
/// targets additionally apply role-hierarchy rules that group scope
/// alone cannot express.
#[derive(Clone)]
pub struct AccessGuard {
    resolver: ScopeResolver,
}

impl AccessGuard {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self {
            resolver: ScopeResolver::new(db),
        }
    }

    pub fn resolver(&self) -> &ScopeResolver {
        &self.resolver
    }

    /// Authorize `caller` to perform a `class` operation on `target`.
    ///
    /// Denials always carry the precise reason; they are never retried
    /// or downgraded here.
    pub async fn authorize(
        &self,
        caller: &User,
        target: Target<'_>,
        class: OperationClass,
    ) -> Result<(), AuthzError> {
        if !caller.is_active {
            return Err(AuthzError::InsufficientRole {
                caller: caller.id,
                role: caller.role,
            });
        }

        match target {
            Target::Group(_) | Target::Account(_) => {
                let scope = self.resolver.resolve(caller, class).await?;
                self.check_scope(caller, &scope, target)
            }
            Target::User(user) => self.authorize_user_target(caller, user, class).await,
        }
    }

    /// Authorize deleting a user. Deletion layers two extra rules on
    /// top of the usual user-target checks: nobody deletes themselves,
    /// and only the designated root administrator deletes other super
    /// admins.
    pub async fn authorize_user_deletion(
        &self,
        caller: &User,
        target: &User,
    ) -> Result<(), AuthzError> {
        if caller.id == target.id {
            return Err(AuthzError::SelfReferenceForbidden { user: caller.id });
        }

        if target.role == Role::SuperAdmin && !caller.is_root() {
            return Err(AuthzError::InsufficientRole {
                caller: caller.id,
                role: caller.role,
            });
        }

        self.authorize(caller, Target::User(target), OperationClass::Admin)
            .await
    }

    fn check_scope(
        &self,
        caller: &User,
        scope: &ScopeSet,
        target: Target<'_>,
    ) -> Result<(), AuthzError> {
        match target.effective_group() {
            Some(group_id) if scope.contains(group_id) => Ok(()),
            Some(group_id) => Err(AuthzError::OutOfScope {
                caller: caller.id,
                group: group_id,
            }),
            // A group-less target is reachable only through the
            // unrestricted scope.
            None if scope.is_unrestricted() => Ok(()),
            None => Err(AuthzError::InsufficientRole {
                caller: caller.id,
                role: caller.role,
            }),
        }
    }

    async fn authorize_user_target(
        &self,
        caller: &User,
        target: &User,
        class: OperationClass,
    ) -> Result<(), AuthzError> {
        // Self-service reads and writes are always allowed. Role and
        // active-flag changes travel as Admin-class operations and fall
        // through to the role rules below.
        if caller.id == target.id && class != OperationClass::Admin {
            return Ok(());
        }

        match caller.role {
            Role::SuperAdmin => Ok(()),
            Role::Manager => {
                // Managers administer only the operators they created,
                // and only inside their currently managed groups.
                if target.role != Role::Operator {
                    return Err(AuthzError::InsufficientRole {
                        caller: caller.id,
                        role: caller.role,
                    });
                }
                if target.created_by != Some(caller.id) {
                    return Err(AuthzError::HierarchyViolation { user: target.id });
                }
                let scope = self.resolver.resolve(caller, class).await?;
                self.check_scope(caller, &scope, Target::User(target))
            }
            Role::Operator => Err(AuthzError::InsufficientRole {
                caller: caller.id,
                role: caller.role,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::tests::harness::{seed, test_db},
        models::{ROOT_USER_ID, Role},
    };

    #[tokio::test]
    async fn manager_allowed_in_managed_group_denied_elsewhere() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let g1 = seed::group(&db, "managed", Some(manager.id)).await;
        let g2 = seed::group(&db, "foreign", None).await;
        let in_g1 = seed::account(&db, "acct-one", g1.id).await;
        let in_g2 = seed::account(&db, "acct-two", g2.id).await;

        let guard = AccessGuard::new(db);

        guard
            .authorize(&manager, Target::Account(&in_g1), OperationClass::Write)
            .await
            .expect("write inside managed group should be allowed");

        let err = guard
            .authorize(&manager, Target::Account(&in_g2), OperationClass::Read)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AuthzError::OutOfScope {
                caller: manager.id,
                group: g2.id
            }
        );
    }

    #[tokio::test]
    async fn reassigning_manager_revokes_write_access() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let successor = seed::user(&db, "successor", Role::Manager, None, None).await;
        let group = seed::group(&db, "alpha", Some(manager.id)).await;

        let guard = AccessGuard::new(db.clone());
        guard
            .authorize(&manager, Target::Group(&group), OperationClass::Write)
            .await
            .expect("manager should start with write access");

        db.groups()
            .assign_manager(group.id, Some(successor.id))
            .await
            .unwrap();

        let err = guard
            .authorize(&manager, Target::Group(&group), OperationClass::Write)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::OutOfScope { .. }));
    }

    #[tokio::test]
    async fn operator_confined_to_own_group() {
        let db = test_db().await;
        let own = seed::group(&db, "own", None).await;
        let other = seed::group(&db, "other", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let operator =
            seed::user(&db, "operator", Role::Operator, Some(own.id), Some(manager.id)).await;
        let in_own = seed::account(&db, "acct-own", own.id).await;
        let in_other = seed::account(&db, "acct-other", other.id).await;

        let guard = AccessGuard::new(db);

        guard
            .authorize(&operator, Target::Account(&in_own), OperationClass::Write)
            .await
            .expect("operator should write inside own group");

        let err = guard
            .authorize(&operator, Target::Account(&in_other), OperationClass::Read)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::OutOfScope { .. }));
    }

    #[tokio::test]
    async fn self_service_write_allowed_admin_not() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let operator =
            seed::user(&db, "operator", Role::Operator, Some(group.id), Some(manager.id)).await;

        let guard = AccessGuard::new(db);

        guard
            .authorize(&operator, Target::User(&operator), OperationClass::Write)
            .await
            .expect("self-service write should be allowed");

        let err = guard
            .authorize(&operator, Target::User(&operator), OperationClass::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InsufficientRole { .. }));
    }

    #[tokio::test]
    async fn manager_administers_only_own_operators() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let rival = seed::user(&db, "rival", Role::Manager, None, None).await;
        db.groups()
            .assign_manager(group.id, Some(manager.id))
            .await
            .unwrap();

        let mine = seed::user_created_by(
            &db,
            "mine",
            Role::Operator,
            Some(group.id),
            Some(manager.id),
            manager.id,
        )
        .await;
        let theirs = seed::user_created_by(
            &db,
            "theirs",
            Role::Operator,
            Some(group.id),
            Some(rival.id),
            rival.id,
        )
        .await;

        let guard = AccessGuard::new(db);

        guard
            .authorize(&manager, Target::User(&mine), OperationClass::Write)
            .await
            .expect("manager should administer own operator");

        let err = guard
            .authorize(&manager, Target::User(&theirs), OperationClass::Write)
            .await
            .unwrap_err();
        assert_eq!(err, AuthzError::HierarchyViolation { user: theirs.id });
    }

    #[tokio::test]
    async fn self_deletion_is_forbidden() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let guard = AccessGuard::new(db);
        let err = guard.authorize_user_deletion(&admin, &admin).await.unwrap_err();
        assert_eq!(err, AuthzError::SelfReferenceForbidden { user: admin.id });
    }

    #[tokio::test]
    async fn only_root_deletes_super_admins() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;
        let victim = seed::user(&db, "victim", Role::SuperAdmin, None, None).await;
        let root = db
            .users()
            .get_by_id(ROOT_USER_ID)
            .await
            .unwrap()
            .expect("root user is seeded by migrations");

        let guard = AccessGuard::new(db);

        let err = guard
            .authorize_user_deletion(&admin, &victim)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InsufficientRole { .. }));

        guard
            .authorize_user_deletion(&root, &victim)
            .await
            .expect("root should delete any super admin");
    }
}
