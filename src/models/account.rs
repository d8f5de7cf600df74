use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A tracked TikTok account. Owned by exactly one group at a time; the
/// group pointer changes atomically on transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Unique handle on the platform (the `@name`).
    pub account_name: String,
    /// Display name as last observed upstream.
    pub nickname: String,
    /// External platform identifier as last observed upstream.
    pub uid: String,
    /// Region as last observed upstream.
    pub region: String,
    pub account_owner: String,
    pub contact_info: String,
    pub notes: String,
    pub responsible_person: String,
    /// Free-form tag object, kept opaque.
    pub tags: Option<serde_json::Value>,
    pub group_id: Uuid,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 100))]
    pub account_name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub account_owner: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub responsible_person: String,
    #[serde(default)]
    pub tags: Option<serde_json::Value>,
    pub group_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAccount {
    #[validate(length(min = 1, max = 100))]
    pub account_name: Option<String>,
    pub nickname: Option<String>,
    pub uid: Option<String>,
    pub region: Option<String>,
    pub account_owner: Option<String>,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
    pub responsible_person: Option<String>,
    pub tags: Option<serde_json::Value>,
    /// Moving the account to another group requires write scope on the
    /// destination group as well.
    pub group_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

/// Filters for account listings.
#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    /// Restrict to these groups. `None` means no group restriction.
    pub group_ids: Option<Vec<Uuid>>,
    pub include_inactive: bool,
}

/// One freshly fetched metric sample for an account, as produced by the
/// external metric source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub account_name: String,
    pub nickname: String,
    pub uid: String,
    pub region: String,
    pub followers: i64,
    pub following: i64,
    pub likes: i64,
    pub videos: i64,
    pub daily_uploads: i64,
    /// When the sample was captured. Its UTC calendar day is the
    /// snapshot deduplication key.
    pub captured_at: DateTime<Utc>,
}
