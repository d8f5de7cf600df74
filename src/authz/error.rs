//! Authorization errors.
//!
//! Every denial names its precise reason and the offending identifier,
//! so callers can reproduce the failure taxonomy without parsing
//! message text.

use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
    /// The caller's scope does not cover the target's group.
    #[error("caller {caller} has no access to group {group}")]
    OutOfScope { caller: Uuid, group: Uuid },

    /// The caller's role forbids the operation regardless of scope.
    #[error("role {role} may not perform this operation (caller {caller})")]
    InsufficientRole { caller: Uuid, role: Role },

    /// The user graph is inconsistent with the role rules, e.g. an
    /// operator without a group or a manager with a manager.
    #[error("user {user} violates the role hierarchy")]
    HierarchyViolation { user: Uuid },

    /// The operation may not target the caller's own record.
    #[error("user {user} may not target their own record with this operation")]
    SelfReferenceForbidden { user: Uuid },

    /// Scope resolution itself failed (storage unavailable).
    #[error("Internal error: {0}")]
    Internal(String),
}
