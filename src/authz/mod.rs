//! Authorization module: scope resolution and access guarding.
//!
//! Access control is hierarchical and group-centric:
//!
//! 1. The caller's role and group relationships resolve to a
//!    [`ScopeSet`], the set of groups the caller may act upon for a
//!    given [`OperationClass`].
//! 2. The [`AccessGuard`] checks a concrete target entity against that
//!    scope, layering role-hierarchy rules on top for user targets.
//!
//! Scope is resolved fresh on every authorization check. Reassigning a
//! group's manager therefore revokes the previous manager's access at
//! the very next check; nothing is cached across the reassignment
//! boundary.

mod error;
mod guard;
mod scope;

use std::collections::HashSet;

pub use error::AuthzError;
pub use guard::{AccessGuard, Target};
pub use scope::ScopeResolver;
use uuid::Uuid;

/// Class of operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationClass {
    /// Listing and viewing entities and analytics.
    Read,
    /// Mutating entities within scope.
    Write,
    /// Administrative mutations (role changes, manager assignment,
    /// deletion).
    Admin,
}

/// The set of groups a caller may act upon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeSet {
    /// Unrestricted access to every group.
    AllGroups,
    /// The groups currently pointing at the caller as their manager.
    /// May be empty, in which case every membership check fails.
    ManagedGroups(HashSet<Uuid>),
    /// Exactly the caller's own group.
    SingleGroup(Uuid),
}

impl ScopeSet {
    /// Whether the scope covers the given group.
    pub fn contains(&self, group_id: Uuid) -> bool {
        match self {
            Self::AllGroups => true,
            Self::ManagedGroups(groups) => groups.contains(&group_id),
            Self::SingleGroup(own) => *own == group_id,
        }
    }

    /// Whether the scope is unrestricted.
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, Self::AllGroups)
    }

    /// The scope as a listing filter: `None` means no group
    /// restriction, otherwise the explicit set of accessible groups.
    pub fn as_group_filter(&self) -> Option<Vec<Uuid>> {
        match self {
            Self::AllGroups => None,
            Self::ManagedGroups(groups) => Some(groups.iter().copied().collect()),
            Self::SingleGroup(own) => Some(vec![*own]),
        }
    }
}
