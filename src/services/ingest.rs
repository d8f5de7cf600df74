use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{
    authz::{AccessGuard, OperationClass, Target},
    db::DbPool,
    models::{Account, AccountFilter, IngestOutcome, MetricSample, UpsertSnapshot, User},
    services::error::{
        BatchErrorKind, BatchFailure, EntityKind, ServiceError, ServiceResult, require,
    },
    source::MetricSource,
};

/// Result of refreshing every account in a group.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub group_id: Uuid,
    /// Accounts whose snapshot was stored.
    pub refreshed: Vec<Uuid>,
    /// Always empty on the success path; partial failure is reported
    /// through the error taxonomy instead.
    pub failures: Vec<BatchFailure>,
}

/// Snapshot ingestion engine.
///
/// Turns freshly fetched metric samples into canonical daily snapshots.
/// The snapshot write is a single conditional upsert keyed by
/// (account, date): re-ingesting the same day overwrites values in
/// place, and concurrent writers serialize at the database so the
/// stored row is always exactly one sample.
#[derive(Clone)]
pub struct IngestService {
    db: Arc<DbPool>,
    source: Arc<dyn MetricSource>,
    guard: AccessGuard,
}

impl IngestService {
    pub fn new(db: Arc<DbPool>, source: Arc<dyn MetricSource>, guard: AccessGuard) -> Self {
        Self { db, source, guard }
    }

    /// Store one sample for an account.
    ///
    /// System-driven: no permission check happens here, callers gate
    /// access before fetching. Profile drift (nickname, uid, region) is
    /// applied to the account record as a separate, logged side effect.
    pub async fn ingest(
        &self,
        account: &Account,
        sample: &MetricSample,
    ) -> ServiceResult<IngestOutcome> {
        let date = sample.captured_at.date_naive();

        let (snapshot, created) = self
            .db
            .snapshots()
            .upsert(UpsertSnapshot {
                account_id: account.id,
                date,
                follower_count: sample.followers,
                following_count: sample.following,
                total_likes: sample.likes,
                video_count: sample.videos,
                daily_uploads: sample.daily_uploads,
            })
            .await?;

        tracing::debug!(
            account = %account.id,
            date = %date,
            created,
            followers = sample.followers,
            "snapshot stored"
        );

        let profile_updated = account.nickname != sample.nickname
            || account.uid != sample.uid
            || account.region != sample.region;
        if profile_updated {
            self.db
                .accounts()
                .apply_profile_drift(account.id, &sample.nickname, &sample.uid, &sample.region)
                .await?;
            tracing::info!(
                account = %account.id,
                nickname = %sample.nickname,
                uid = %sample.uid,
                region = %sample.region,
                "profile fields drifted upstream; account updated"
            );
        }

        Ok(IngestOutcome {
            snapshot,
            created,
            profile_updated,
        })
    }

    /// Fetch fresh metrics for one account and ingest them. The fetch
    /// is bounded by the caller-supplied timeout.
    pub async fn refresh_account(
        &self,
        actor: &User,
        account_id: Uuid,
        timeout: Duration,
    ) -> ServiceResult<IngestOutcome> {
        let account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        self.guard
            .authorize(actor, Target::Account(&account), OperationClass::Write)
            .await?;

        let sample = self.fetch_bounded(&account, timeout).await?;
        self.ingest(&account, &sample).await
    }

    /// Refresh every account in a group.
    ///
    /// Accounts are processed independently and concurrently; one
    /// account failing never aborts the rest. Full success returns the
    /// report, any failure surfaces as `PartialBatchFailure` carrying
    /// both the refreshed ids and the per-account error kinds.
    pub async fn batch_refresh(
        &self,
        actor: &User,
        group_id: Uuid,
        timeout: Duration,
    ) -> ServiceResult<BatchReport> {
        let group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        self.guard
            .authorize(actor, Target::Group(&group), OperationClass::Write)
            .await?;

        let accounts = self
            .db
            .accounts()
            .list(AccountFilter {
                group_ids: Some(vec![group_id]),
                ..Default::default()
            })
            .await?;

        let mut tasks = JoinSet::new();
        for account in accounts {
            let service = self.clone();
            tasks.spawn(async move {
                let result = match service.fetch_bounded(&account, timeout).await {
                    Ok(sample) => service.ingest(&account, &sample).await.map(|_| ()),
                    Err(e) => Err(e),
                };
                (account, result)
            });
        }

        let mut refreshed = Vec::new();
        let mut failures = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((account, Ok(()))) => refreshed.push(account.id),
                Ok((account, Err(error))) => {
                    tracing::warn!(
                        account = %account.id,
                        name = %account.account_name,
                        error = %error,
                        "account refresh failed"
                    );
                    failures.push(BatchFailure {
                        account_id: account.id,
                        account_name: account.account_name,
                        kind: BatchErrorKind::classify(&error),
                    });
                }
                Err(join_error) => {
                    tracing::error!(error = %join_error, "refresh task aborted");
                }
            }
        }

        refreshed.sort();
        if failures.is_empty() {
            Ok(BatchReport {
                group_id,
                refreshed,
                failures,
            })
        } else {
            failures.sort_by(|a, b| a.account_id.cmp(&b.account_id));
            Err(ServiceError::PartialBatchFailure {
                refreshed,
                failures,
            })
        }
    }

    async fn fetch_bounded(
        &self,
        account: &Account,
        timeout: Duration,
    ) -> ServiceResult<MetricSample> {
        match tokio::time::timeout(timeout, self.source.fetch_sample(&account.account_name)).await
        {
            Ok(Ok(sample)) => Ok(sample),
            Ok(Err(reason)) => Err(ServiceError::UpstreamUnavailable {
                account: account.id,
                reason,
            }),
            Err(_) => Err(ServiceError::UpstreamUnavailable {
                account: account.id,
                reason: crate::source::SourceError::Timeout,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::{
        db::tests::harness::{seed, test_db},
        models::Role,
        source::{SourceError, SourceStatus},
    };

    /// Deterministic source: maps account names to canned outcomes.
    struct StaticSource {
        samples: HashMap<String, Result<MetricSample, SourceError>>,
        delay: Option<Duration>,
    }

    impl StaticSource {
        fn new() -> Self {
            Self {
                samples: HashMap::new(),
                delay: None,
            }
        }

        fn with_sample(mut self, sample: MetricSample) -> Self {
            self.samples
                .insert(sample.account_name.clone(), Ok(sample));
            self
        }

        fn with_failure(mut self, account_name: &str, error: SourceError) -> Self {
            self.samples.insert(account_name.to_string(), Err(error));
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }
    }

    #[async_trait]
    impl MetricSource for StaticSource {
        async fn fetch_sample(&self, account_name: &str) -> Result<MetricSample, SourceError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.samples
                .get(account_name)
                .cloned()
                .unwrap_or_else(|| Err(SourceError::NotFound(account_name.to_string())))
        }

        async fn status(&self) -> SourceStatus {
            SourceStatus::Operational
        }
    }

    fn sample(account_name: &str, followers: i64) -> MetricSample {
        MetricSample {
            account_name: account_name.to_string(),
            nickname: format!("Nick {}", account_name),
            uid: "42".to_string(),
            region: "US".to_string(),
            followers,
            following: 10,
            likes: followers * 10,
            videos: 5,
            daily_uploads: 1,
            captured_at: Utc.with_ymd_and_hms(2024, 1, 1, 14, 30, 0).unwrap(),
        }
    }

    fn service(db: &Arc<DbPool>, source: StaticSource) -> IngestService {
        IngestService::new(db.clone(), Arc::new(source), AccessGuard::new(db.clone()))
    }

    #[tokio::test]
    async fn ingest_is_idempotent_per_day() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let account = seed::account(&db, "creator_one", group.id).await;
        let ingest = service(&db, StaticSource::new());

        let one = sample("creator_one", 100);
        let outcome = ingest.ingest(&account, &one).await.unwrap();
        assert!(outcome.created);

        let outcome = ingest.ingest(&account, &one).await.unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.snapshot.follower_count, 100);

        assert_eq!(db.snapshots().count_for_account(account.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn same_day_reingest_overwrites_not_accumulates() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let account = seed::account(&db, "creator_one", group.id).await;
        let ingest = service(&db, StaticSource::new());

        ingest.ingest(&account, &sample("creator_one", 100)).await.unwrap();
        let outcome = ingest
            .ingest(&account, &sample("creator_one", 150))
            .await
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.snapshot.follower_count, 150);
        let stored = db
            .snapshots()
            .series_for_account(account.id, outcome.snapshot.date)
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].follower_count, 150);
    }

    #[tokio::test]
    async fn profile_drift_updates_account_once() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let account = seed::account(&db, "creator_one", group.id).await;
        let ingest = service(&db, StaticSource::new());

        let outcome = ingest
            .ingest(&account, &sample("creator_one", 100))
            .await
            .unwrap();
        assert!(outcome.profile_updated);

        let updated = db.accounts().get_by_id(account.id).await.unwrap().unwrap();
        assert_eq!(updated.nickname, "Nick creator_one");
        assert_eq!(updated.uid, "42");
        assert_eq!(updated.region, "US");

        // Re-ingesting the same values causes no further drift write.
        let outcome = ingest.ingest(&updated, &sample("creator_one", 100)).await.unwrap();
        assert!(!outcome.profile_updated);
    }

    #[tokio::test]
    async fn refresh_checks_scope_before_fetching() {
        let db = test_db().await;
        let own = seed::group(&db, "own", None).await;
        let other = seed::group(&db, "other", None).await;
        let manager = seed::user(&db, "manager", Role::Manager, None, None).await;
        let operator =
            seed::user(&db, "operator", Role::Operator, Some(own.id), Some(manager.id)).await;
        let foreign = seed::account(&db, "foreign", other.id).await;

        let ingest = service(&db, StaticSource::new().with_sample(sample("foreign", 100)));
        let err = ingest
            .refresh_account(&operator, foreign.id, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Denied(_)));
        assert_eq!(db.snapshots().count_for_account(foreign.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn refresh_times_out_as_distinct_error() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let account = seed::account(&db, "creator_one", group.id).await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let ingest = service(
            &db,
            StaticSource::new()
                .with_sample(sample("creator_one", 100))
                .with_delay(Duration::from_millis(200)),
        );

        let err = ingest
            .refresh_account(&admin, account.id, Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::UpstreamUnavailable {
                reason: SourceError::Timeout,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn batch_refresh_reports_partial_failure() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let good = seed::account(&db, "good", group.id).await;
        let bad = seed::account(&db, "bad", group.id).await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let ingest = service(
            &db,
            StaticSource::new()
                .with_sample(sample("good", 500))
                .with_failure("bad", SourceError::Unavailable("boom".to_string())),
        );

        let err = ingest
            .batch_refresh(&admin, group.id, Duration::from_secs(1))
            .await
            .unwrap_err();

        match err {
            ServiceError::PartialBatchFailure {
                refreshed,
                failures,
            } => {
                assert_eq!(refreshed, vec![good.id]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].account_id, bad.id);
                assert_eq!(failures[0].kind, BatchErrorKind::UpstreamUnavailable);
            }
            other => panic!("expected partial batch failure, got {:?}", other),
        }

        // The good account's snapshot landed despite the failure.
        assert_eq!(db.snapshots().count_for_account(good.id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn batch_refresh_full_success() {
        let db = test_db().await;
        let group = seed::group(&db, "alpha", None).await;
        let a1 = seed::account(&db, "one", group.id).await;
        let a2 = seed::account(&db, "two", group.id).await;
        let admin = seed::user(&db, "admin", Role::SuperAdmin, None, None).await;

        let ingest = service(
            &db,
            StaticSource::new()
                .with_sample(sample("one", 100))
                .with_sample(sample("two", 200)),
        );

        let report = ingest
            .batch_refresh(&admin, group.id, Duration::from_secs(1))
            .await
            .unwrap();

        let mut expected = vec![a1.id, a2.id];
        expected.sort();
        assert_eq!(report.refreshed, expected);
        assert!(report.failures.is_empty());
    }
}
