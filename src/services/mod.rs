//! Service layer: the caller-facing operations of the system.
//!
//! Each service is a thin, stateless struct over the shared
//! [`DbPool`](crate::db::DbPool) handle plus the pieces it needs (the
//! access guard, the metric source). Every operation resolves the
//! caller's scope fresh, authorizes the concrete target, then reads or
//! writes through the repositories.

mod accounts;
mod analytics;
mod error;
mod groups;
mod ingest;
mod users;

use std::sync::Arc;

pub use accounts::AccountService;
pub use analytics::AnalyticsService;
pub use error::{BatchErrorKind, BatchFailure, EntityKind, ServiceError, ServiceResult};
pub use groups::GroupService;
pub use ingest::{BatchReport, IngestService};
pub use users::UserService;

use crate::{
    authz::{AccessGuard, ScopeResolver},
    config::DashboardConfig,
    db::DbPool,
    source::MetricSource,
};

/// All services wired over one entity store and metric source.
#[derive(Clone)]
pub struct Services {
    pub users: UserService,
    pub groups: GroupService,
    pub accounts: AccountService,
    pub ingest: IngestService,
    pub analytics: AnalyticsService,
}

impl Services {
    pub fn new(
        db: Arc<DbPool>,
        source: Arc<dyn MetricSource>,
        dashboard: DashboardConfig,
    ) -> Self {
        let guard = AccessGuard::new(db.clone());
        Self {
            users: UserService::new(db.clone(), guard.clone()),
            groups: GroupService::new(db.clone(), guard.clone()),
            accounts: AccountService::new(db.clone(), guard.clone()),
            ingest: IngestService::new(db.clone(), source, guard.clone()),
            analytics: AnalyticsService::new(db.clone(), ScopeResolver::new(db), dashboard),
        }
    }
}
