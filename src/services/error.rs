use std::fmt;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{authz::AuthzError, db::DbError, source::SourceError};

/// Entity kinds, for error attribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    User,
    Group,
    Account,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::User => "user",
            Self::Group => "group",
            Self::Account => "account",
        };
        write!(f, "{}", s)
    }
}

/// Service-level error taxonomy.
///
/// Every variant carries the offending identifier so callers can build
/// precise responses; the service layer itself never formats prose
/// beyond these display strings. Authorization denials pass through
/// unchanged and are never retried or downgraded.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: Uuid },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Denied(#[from] AuthzError),

    #[error("upstream source failed for account {account}: {reason}")]
    UpstreamUnavailable {
        account: Uuid,
        #[source]
        reason: SourceError,
    },

    #[error("batch refresh finished with {} failed accounts", .failures.len())]
    PartialBatchFailure {
        /// Accounts that were refreshed successfully before or after
        /// the failures; partial success is reported, not discarded.
        refreshed: Vec<Uuid>,
        failures: Vec<BatchFailure>,
    },

    #[error(transparent)]
    Db(DbError),
}

impl From<DbError> for ServiceError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::Validation(msg) => Self::Validation(msg),
            other => Self::Db(other),
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// One failed item of a batch operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchFailure {
    pub account_id: Uuid,
    pub account_name: String,
    pub kind: BatchErrorKind,
}

/// Why a batch item failed, coarse enough to drive retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchErrorKind {
    /// The account no longer exists upstream.
    UpstreamNotFound,
    /// The upstream did not answer within the deadline.
    UpstreamTimeout,
    /// The upstream answered with an error.
    UpstreamUnavailable,
    /// The upstream answered but the payload was unusable.
    UpstreamInvalid,
    /// Persisting the sample failed locally.
    Storage,
}

impl BatchErrorKind {
    /// Classify a per-account refresh error.
    pub fn classify(error: &ServiceError) -> Self {
        match error {
            ServiceError::UpstreamUnavailable { reason, .. } => match reason {
                SourceError::NotFound(_) => Self::UpstreamNotFound,
                SourceError::Timeout => Self::UpstreamTimeout,
                SourceError::Unavailable(_) => Self::UpstreamUnavailable,
                SourceError::Parse(_) => Self::UpstreamInvalid,
            },
            _ => Self::Storage,
        }
    }
}

/// Unwrap an optional lookup result into the error taxonomy.
pub(crate) fn require<T>(entity: Option<T>, kind: EntityKind, id: Uuid) -> ServiceResult<T> {
    entity.ok_or(ServiceError::NotFound { kind, id })
}
