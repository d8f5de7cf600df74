use std::sync::Arc;

use crate::{
    authz::{AuthzError, OperationClass, ScopeSet},
    db::{DbPool, DbResult},
    models::{Group, Role, User},
};

/// Resolves the set of groups a caller may act upon.
///
/// Resolution always reads the current state of the group graph; a
/// manager's scope is exactly the groups whose `managed_by` pointer
/// names them right now. Having created a group grants nothing.
#[derive(Clone)]
pub struct ScopeResolver {
    db: Arc<DbPool>,
}

impl ScopeResolver {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Resolve the caller's scope for one class of operation.
    ///
    /// The class does not change which groups are visible today, but it
    /// is part of the contract so role-specific narrowing has a single
    /// place to live.
    pub async fn resolve(
        &self,
        caller: &User,
        _class: OperationClass,
    ) -> Result<ScopeSet, AuthzError> {
        match caller.role {
            Role::SuperAdmin => Ok(ScopeSet::AllGroups),
            Role::Manager => {
                let groups = self
                    .db
                    .groups()
                    .list_managed_by(caller.id)
                    .await
                    .map_err(|e| AuthzError::Internal(e.to_string()))?;
                Ok(ScopeSet::ManagedGroups(
                    groups.into_iter().map(|g| g.id).collect(),
                ))
            }
            Role::Operator => match caller.group_id {
                Some(group_id) => Ok(ScopeSet::SingleGroup(group_id)),
                None => Err(AuthzError::HierarchyViolation { user: caller.id }),
            },
        }
    }

    /// Materialize the groups covered by an already resolved scope,
    /// for aggregations that iterate per group.
    pub async fn groups_in_scope(&self, scope: &ScopeSet) -> DbResult<Vec<Group>> {
        match scope {
            ScopeSet::AllGroups => self.db.groups().list(false).await,
            ScopeSet::ManagedGroups(ids) => {
                let mut groups = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(group) = self.db.groups().get_by_id(*id).await? {
                        groups.push(group);
                    }
                }
                groups.sort_by_key(|g| (g.created_at, g.id));
                Ok(groups)
            }
            ScopeSet::SingleGroup(group_id) => {
                Ok(self.db.groups().get_by_id(*group_id).await?.into_iter().collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        authz::OperationClass,
        db::tests::harness::{seed, test_db},
        models::Role,
    };

    #[tokio::test]
    async fn super_admin_resolves_to_all_groups() {
        let db = test_db().await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let resolver = ScopeResolver::new(db);
        let scope = resolver
            .resolve(&admin, OperationClass::Admin)
            .await
            .expect("resolution should succeed");

        assert_eq!(scope, ScopeSet::AllGroups);
    }

    #[tokio::test]
    async fn manager_scope_is_current_managed_groups() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let g1 = seed::group(&db, "alpha", Some(manager.id)).await;
        let _g2 = seed::group(&db, "beta", None).await;

        let resolver = ScopeResolver::new(db.clone());
        let scope = resolver
            .resolve(&manager, OperationClass::Write)
            .await
            .expect("resolution should succeed");

        assert!(scope.contains(g1.id));
        assert_eq!(scope.as_group_filter().map(|g| g.len()), Some(1));
    }

    #[tokio::test]
    async fn manager_reassignment_revokes_on_next_resolution() {
        let db = test_db().await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let other = seed::user(&db, "other", Role::Manager, None, None).await;
        let group = seed::group(&db, "alpha", Some(manager.id)).await;

        let resolver = ScopeResolver::new(db.clone());
        let scope = resolver
            .resolve(&manager, OperationClass::Write)
            .await
            .unwrap();
        assert!(scope.contains(group.id));

        db.groups()
            .assign_manager(group.id, Some(other.id))
            .await
            .unwrap();

        let scope = resolver
            .resolve(&manager, OperationClass::Write)
            .await
            .unwrap();
        assert!(!scope.contains(group.id));
    }

    #[tokio::test]
    async fn operator_resolves_to_own_group() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let operator =
            seed::user(&db, "operator", Role::Operator, Some(group.id), Some(manager.id)).await;

        let resolver = ScopeResolver::new(db);
        let scope = resolver
            .resolve(&operator, OperationClass::Write)
            .await
            .unwrap();

        assert_eq!(scope, ScopeSet::SingleGroup(group.id));
    }

    #[tokio::test]
    async fn operator_without_group_fails_resolution() {
        let db = test_db().await;
        let orphan = seed::user(&db, "orphan", Role::Operator, None, None).await;

        let resolver = ScopeResolver::new(db);
        let err = resolver
            .resolve(&orphan, OperationClass::Read)
            .await
            .unwrap_err();

        assert_eq!(err, AuthzError::HierarchyViolation { user: orphan.id });
    }
}
