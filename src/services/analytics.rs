use std::{collections::HashMap, sync::Arc};

use chrono::{Days, NaiveDate, Utc};
use uuid::Uuid;

use crate::{
    authz::{AuthzError, OperationClass, ScopeResolver},
    config::DashboardConfig,
    db::DbPool,
    models::{
        AccountFilter, Comparison, ComparisonEntry, DashboardSummary, GroupRollup, GroupTrend,
        MetricGrowth, Snapshot, TopAccount, TrendSeries, User,
    },
    services::error::{EntityKind, ServiceResult, require},
};

/// Aggregation engine over stored snapshots.
///
/// Every operation starts by resolving the caller's scope and uses the
/// resolved group set as a filter; nothing outside the scope leaks into
/// any result, and out-of-scope requests fail rather than returning
/// partial data.
#[derive(Clone)]
pub struct AnalyticsService {
    db: Arc<DbPool>,
    resolver: ScopeResolver,
    config: DashboardConfig,
}

impl AnalyticsService {
    pub fn new(db: Arc<DbPool>, resolver: ScopeResolver, config: DashboardConfig) -> Self {
        Self {
            db,
            resolver,
            config,
        }
    }

    /// Date-ordered trend for one account over the trailing window
    /// (inclusive of today). An empty window yields empty series.
    pub async fn account_trend(
        &self,
        caller: &User,
        account_id: Uuid,
        window_days: i64,
    ) -> ServiceResult<TrendSeries> {
        let scope = self.resolver.resolve(caller, OperationClass::Read).await?;

        let account = require(
            self.db.accounts().get_by_id(account_id).await?,
            EntityKind::Account,
            account_id,
        )?;
        if !scope.contains(account.group_id) {
            return Err(AuthzError::OutOfScope {
                caller: caller.id,
                group: account.group_id,
            }
            .into());
        }

        let Some(since) = window_start(window_days) else {
            return Ok(TrendSeries::default());
        };

        let snapshots = self
            .db
            .snapshots()
            .series_for_account(account_id, since)
            .await?;
        Ok(TrendSeries::from_snapshots(&snapshots))
    }

    /// Cross-account comparison over a shared window.
    ///
    /// All-or-nothing: one account outside the caller's scope fails the
    /// whole comparison. An empty id list is an empty result.
    pub async fn compare(
        &self,
        caller: &User,
        account_ids: &[Uuid],
        window_days: i64,
    ) -> ServiceResult<Comparison> {
        let mut comparison = Comparison {
            window_days,
            entries: Vec::with_capacity(account_ids.len()),
        };
        if account_ids.is_empty() {
            return Ok(comparison);
        }

        let scope = self.resolver.resolve(caller, OperationClass::Read).await?;

        // Authorize every account before touching any snapshot so a
        // denial can never produce partial data.
        let mut accounts = Vec::with_capacity(account_ids.len());
        for &account_id in account_ids {
            let account = require(
                self.db.accounts().get_by_id(account_id).await?,
                EntityKind::Account,
                account_id,
            )?;
            if !scope.contains(account.group_id) {
                return Err(AuthzError::OutOfScope {
                    caller: caller.id,
                    group: account.group_id,
                }
                .into());
            }
            accounts.push(account);
        }

        let since = window_start(window_days);
        for account in accounts {
            let snapshots = match since {
                Some(since) => {
                    self.db
                        .snapshots()
                        .series_for_account(account.id, since)
                        .await?
                }
                None => Vec::new(),
            };

            let (followers, likes, videos) = growth_over(&snapshots);
            comparison.entries.push(ComparisonEntry {
                account_id: account.id,
                account_name: account.account_name,
                trend: TrendSeries::from_snapshots(&snapshots),
                followers,
                likes,
                videos,
            });
        }

        Ok(comparison)
    }

    /// Union of snapshots across every account in a group, ordered by
    /// date then account.
    pub async fn group_trend(
        &self,
        caller: &User,
        group_id: Uuid,
        window_days: i64,
    ) -> ServiceResult<GroupTrend> {
        let scope = self.resolver.resolve(caller, OperationClass::Read).await?;

        let group = require(
            self.db.groups().get_by_id(group_id).await?,
            EntityKind::Group,
            group_id,
        )?;
        if !scope.contains(group.id) {
            return Err(AuthzError::OutOfScope {
                caller: caller.id,
                group: group.id,
            }
            .into());
        }

        let snapshots = match window_start(window_days) {
            Some(since) => self.db.snapshots().series_for_group(group_id, since).await?,
            None => Vec::new(),
        };

        Ok(GroupTrend {
            group_id,
            window_days,
            snapshots,
        })
    }

    /// Caller-scoped dashboard: per-group rollups over the latest
    /// snapshot of each account, global totals, and the top accounts by
    /// follower count.
    pub async fn dashboard(&self, caller: &User) -> ServiceResult<DashboardSummary> {
        let scope = self.resolver.resolve(caller, OperationClass::Read).await?;
        let groups = self.resolver.groups_in_scope(&scope).await?;

        let mut summary = DashboardSummary::default();
        let mut ranking: Vec<TopAccount> = Vec::new();

        for group in groups {
            let latest = self
                .db
                .snapshots()
                .latest_per_account_in_group(group.id)
                .await?;
            let account_count = self.db.groups().account_count(group.id).await?;

            let total_followers: i64 = latest.iter().map(|s| s.follower_count).sum();
            let total_likes: i64 = latest.iter().map(|s| s.total_likes).sum();
            let total_videos: i64 = latest.iter().map(|s| s.video_count).sum();

            let growth_rate = self.group_growth(&latest).await?;

            ranking.extend(self.rank_entries(&group.id, &latest).await?);

            summary.total_accounts += account_count;
            summary.total_followers += total_followers;
            summary.total_likes += total_likes;
            summary.total_videos += total_videos;
            summary.groups.push(GroupRollup {
                group_id: group.id,
                group_name: group.name,
                account_count,
                total_followers,
                total_likes,
                total_videos,
                growth_rate,
            });
        }

        // Stable ranking: follower count descending, ties broken by the
        // lower account identifier.
        ranking.sort_by(|a, b| {
            b.follower_count
                .cmp(&a.follower_count)
                .then(a.account_id.cmp(&b.account_id))
        });
        ranking.truncate(self.config.top_accounts);
        summary.top_accounts = ranking;

        Ok(summary)
    }

    /// Follower growth for a group: the latest snapshots against the
    /// snapshots a configured number of days prior. Accounts without
    /// that history contribute nothing, and a group with no history at
    /// all reports zero rather than an error.
    async fn group_growth(&self, latest: &[Snapshot]) -> ServiceResult<f64> {
        let window = Days::new(self.config.growth_window_days as u64);

        let mut latest_sum = 0i64;
        let mut prior_sum = 0i64;
        let mut have_prior = false;

        for snapshot in latest {
            let Some(prior_date) = snapshot.date.checked_sub_days(window) else {
                continue;
            };
            if let Some(prior) = self
                .db
                .snapshots()
                .get_by_account_and_date(snapshot.account_id, prior_date)
                .await?
            {
                have_prior = true;
                latest_sum += snapshot.follower_count;
                prior_sum += prior.follower_count;
            }
        }

        if !have_prior {
            return Ok(0.0);
        }
        Ok((latest_sum - prior_sum) as f64 / prior_sum.max(1) as f64)
    }

    async fn rank_entries(
        &self,
        group_id: &Uuid,
        latest: &[Snapshot],
    ) -> ServiceResult<Vec<TopAccount>> {
        if latest.is_empty() {
            return Ok(Vec::new());
        }

        let accounts = self
            .db
            .accounts()
            .list(AccountFilter {
                group_ids: Some(vec![*group_id]),
                include_inactive: true,
            })
            .await?;
        let names: HashMap<Uuid, String> = accounts
            .into_iter()
            .map(|a| (a.id, a.account_name))
            .collect();

        Ok(latest
            .iter()
            .map(|snapshot| TopAccount {
                account_id: snapshot.account_id,
                account_name: names
                    .get(&snapshot.account_id)
                    .cloned()
                    .unwrap_or_default(),
                group_id: *group_id,
                follower_count: snapshot.follower_count,
            })
            .collect())
    }
}

/// First day of a trailing window that ends today (UTC). Non-positive
/// windows have no start.
fn window_start(window_days: i64) -> Option<NaiveDate> {
    if window_days <= 0 {
        return None;
    }
    let today = Utc::now().date_naive();
    today.checked_sub_days(Days::new((window_days - 1) as u64))
}

/// Per-metric growth between the first and last snapshot of a series.
fn growth_over(snapshots: &[Snapshot]) -> (MetricGrowth, MetricGrowth, MetricGrowth) {
    match (snapshots.first(), snapshots.last()) {
        (Some(first), Some(last)) => (
            MetricGrowth::over(first.follower_count, last.follower_count),
            MetricGrowth::over(first.total_likes, last.total_likes),
            MetricGrowth::over(first.video_count, last.video_count),
        ),
        _ => Default::default(),
    }
}
