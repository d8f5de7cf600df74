//! External metric source.
//!
//! The source produces one [`MetricSample`](crate::models::MetricSample)
//! per account on demand. The production implementation scrapes the
//! public TikTok profile page; tests substitute deterministic doubles
//! behind the same trait.

mod tiktok;

use async_trait::async_trait;
use thiserror::Error;

pub use tiktok::TikTokSource;

use crate::models::MetricSample;

/// Failure modes of the external source. `Timeout` is kept distinct
/// from `Unavailable` so batch drivers can tell a slow upstream from a
/// broken one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("account '{0}' does not exist upstream")]
    NotFound(String),

    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("upstream request timed out")]
    Timeout,

    #[error("could not extract account data: {0}")]
    Parse(String),
}

/// Coarse upstream health, as reported by a probe fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Operational,
    Timeout,
    Unavailable,
}

#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Fetch a fresh metric sample for the named account.
    async fn fetch_sample(&self, account_name: &str) -> Result<MetricSample, SourceError>;

    /// Whether the named account exists upstream.
    async fn validate_account(&self, account_name: &str) -> Result<bool, SourceError> {
        match self.fetch_sample(account_name).await {
            Ok(_) => Ok(true),
            Err(SourceError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Probe upstream health.
    async fn status(&self) -> SourceStatus;
}
