use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::{MetricSource, SourceError, SourceStatus};
use crate::{config::SourceConfig, models::MetricSample};

/// Account used for health probes. Chosen because it always exists.
const PROBE_ACCOUNT: &str = "tiktok";

/// Metric source backed by the public TikTok web profile pages.
///
/// Profile pages embed the full account state as a JSON payload inside
/// a script tag; this source fetches the page with browser-like headers
/// and extracts the `userInfo` object from that payload.
pub struct TikTokSource {
    client: reqwest::Client,
    base_url: String,
}

impl TikTokSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MetricSource for TikTokSource {
    async fn fetch_sample(&self, account_name: &str) -> Result<MetricSample, SourceError> {
        let account_name = account_name.trim();
        if account_name.is_empty() {
            return Err(SourceError::NotFound(String::new()));
        }

        let url = format!("{}/@{}", self.base_url, account_name);
        let response = self
            .client
            .get(&url)
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(account_name.to_string()));
        }
        if !response.status().is_success() {
            return Err(SourceError::Unavailable(format!(
                "unexpected status {} for {}",
                response.status(),
                url
            )));
        }

        let body = response.text().await.map_err(map_reqwest_error)?;
        parse_sample(&body, account_name)
    }

    async fn status(&self) -> SourceStatus {
        match self.fetch_sample(PROBE_ACCOUNT).await {
            Ok(_) => SourceStatus::Operational,
            Err(SourceError::Timeout) => SourceStatus::Timeout,
            Err(_) => SourceStatus::Unavailable,
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> SourceError {
    if e.is_timeout() {
        SourceError::Timeout
    } else {
        SourceError::Unavailable(e.to_string())
    }
}

/// Extract the sample from a profile page body.
///
/// The page embeds `"userInfo": {...}` inside a state script. The exact
/// script id has changed across frontend releases, so the extraction
/// keys on the field name rather than the surrounding markup.
fn parse_sample(body: &str, account_name: &str) -> Result<MetricSample, SourceError> {
    let info = extract_user_info(body)
        .ok_or_else(|| SourceError::Parse("user info payload not found in page".to_string()))?;

    let user = &info["user"];
    let stats = &info["stats"];
    if user.is_null() || stats.is_null() {
        return Err(SourceError::Parse(
            "user info payload is missing user or stats".to_string(),
        ));
    }

    Ok(MetricSample {
        account_name: str_field(user, "uniqueId").unwrap_or_else(|| account_name.to_string()),
        nickname: str_field(user, "nickname").unwrap_or_default(),
        uid: str_field(user, "id").unwrap_or_default(),
        region: str_field(user, "region").unwrap_or_default(),
        followers: int_field(stats, "followerCount"),
        following: int_field(stats, "followingCount"),
        // Older payloads call the like counter "heart".
        likes: stats
            .get("heartCount")
            .and_then(Value::as_i64)
            .unwrap_or_else(|| int_field(stats, "heart")),
        videos: int_field(stats, "videoCount"),
        // Not exposed by the page; derived from history downstream.
        daily_uploads: 0,
        captured_at: Utc::now(),
    })
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Locate the JSON object following `"userInfo":` in the page body.
fn extract_user_info(body: &str) -> Option<Value> {
    let marker = body.find("\"userInfo\"")?;
    let rest = &body[marker..];
    let start = marker + rest.find('{')?;
    let object = extract_json_object(&body[start..])?;
    serde_json::from_str(object).ok()
}

/// Take the balanced JSON object at the start of `input`. Braces inside
/// string literals (and their escapes) do not count toward balance.
fn extract_json_object(input: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
