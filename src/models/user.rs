use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Reserved identifier of the designated root administrator.
///
/// The root user is seeded by the initial migration and is the only
/// super admin permitted to delete other super admins.
pub const ROOT_USER_ID: Uuid = Uuid::nil();

/// Caller role, ordered from most to least privileged.
///
/// Role determines how access scope is resolved: super admins see every
/// group, managers see the groups whose `managed_by` points at them,
/// operators see exactly their own group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    SuperAdmin,
    Manager,
    Operator,
}

impl Role {
    /// Convert to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Manager => "manager",
            Self::Operator => "operator",
        }
    }

    /// Parse from database string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(Self::SuperAdmin),
            "manager" => Some(Self::Manager),
            "operator" => Some(Self::Operator),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    /// Group membership. Required for operators, absent for the rest.
    pub group_id: Option<Uuid>,
    /// The user that created this record.
    pub created_by: Option<Uuid>,
    /// The manager administratively responsible for this user.
    /// Meaningful for operators only; managers are peers.
    pub managed_by: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Whether this user is the designated root administrator.
    pub fn is_root(&self) -> bool {
        self.id == ROOT_USER_ID
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    pub role: Role,
    pub group_id: Option<Uuid>,
    pub managed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    pub role: Option<Role>,
    pub group_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Filters for user listings. All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub role: Option<Role>,
    pub group_id: Option<Uuid>,
    pub managed_by: Option<Uuid>,
    pub include_inactive: bool,
}
