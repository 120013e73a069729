// src/connectors/instagram.rs
//! Instagram hashtag posts via the Apify hashtag-scraper actor (sync run).

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, log_scale, PlatformConnector};
use crate::discovery::TimeRange;
use crate::metrics::TOPICS_FETCHED_TOTAL;
use crate::topic::{truncate_chars, Platform, TrendingTopic};

pub const APIFY_API_URL: &str = "https://api.apify.com/v2";
const HASHTAG_SCRAPER: &str = "apify~instagram-hashtag-scraper";
const TITLE_MAX_CHARS: usize = 100;

#[derive(Debug, Clone, Serialize)]
struct HashtagInput {
    hashtags: Vec<String>,
    #[serde(rename = "resultsLimit")]
    results_limit: u32,
}

/// One post from the actor's dataset.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstagramPost {
    pub caption: Option<String>,
    pub owner_username: Option<String>,
    pub url: Option<String>,
    pub short_code: Option<String>,
    pub likes_count: Option<i64>,
    pub comments_count: Option<i64>,
    pub timestamp: Option<DateTime<Utc>>,
}

/// `"AI Marketing!"` → `"aimarketing"`. Empty when nothing usable remains.
pub fn hashtag_for(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Likes plus double-weighted comments, log-scaled.
pub fn engagement_score(likes: i64, comments: i64) -> f64 {
    10.0 * log_scale(likes.max(0) as f64 + 2.0 * comments.max(0) as f64)
}

/// Map dataset items to topics, dropping captionless posts and posts older
/// than `since`.
pub fn normalize_instagram(
    posts: Vec<InstagramPost>,
    hashtag: &str,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Vec<TrendingTopic> {
    let mut out = Vec::with_capacity(posts.len());
    for post in posts {
        let caption = post.caption.clone().unwrap_or_default();
        let Some(first_line) = caption.lines().map(str::trim).find(|l| !l.is_empty()) else {
            continue;
        };
        let recency = post.timestamp.unwrap_or(now);
        if recency < since {
            continue;
        }
        let native = post
            .short_code
            .clone()
            .or_else(|| post.url.clone())
            .unwrap_or_default();
        let url = post.url.clone().unwrap_or_else(|| match &post.short_code {
            Some(code) => format!("https://www.instagram.com/p/{code}/"),
            None => String::new(),
        });
        let raw = serde_json::to_value(&post).unwrap_or(serde_json::Value::Null);
        out.push(
            TrendingTopic::new(
                Platform::Instagram,
                &native,
                &truncate_chars(first_line, TITLE_MAX_CHARS),
                &format!("#{hashtag}"),
                &caption,
                url,
                engagement_score(
                    post.likes_count.unwrap_or(0),
                    post.comments_count.unwrap_or(0),
                ),
                recency,
            )
            .with_raw_data(raw),
        );
    }
    out
}

pub struct InstagramConnector {
    http: reqwest::Client,
    token: Option<String>,
    base_url: String,
    results_limit: u32,
}

impl InstagramConnector {
    pub fn new(token: Option<String>) -> Result<Self> {
        // Sync actor runs routinely take tens of seconds.
        Ok(Self {
            http: http_client(Duration::from_secs(90))?,
            token,
            base_url: APIFY_API_URL.to_string(),
            results_limit: 30,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_results_limit(mut self, n: u32) -> Self {
        self.results_limit = n.max(1);
        self
    }
}

#[async_trait]
impl PlatformConnector for InstagramConnector {
    async fn discover_by_keyword(
        &self,
        keyword: &str,
        time_range: TimeRange,
    ) -> Result<Vec<TrendingTopic>> {
        let Some(token) = self.token.as_deref() else {
            tracing::debug!(platform = "instagram", "no Apify token; skipping");
            return Ok(Vec::new());
        };
        let hashtag = hashtag_for(keyword);
        if hashtag.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/acts/{}/run-sync-get-dataset-items",
            self.base_url, HASHTAG_SCRAPER
        );
        let resp = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&HashtagInput {
                hashtags: vec![hashtag.clone()],
                results_limit: self.results_limit,
            })
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("apify hashtag run")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("apify error (status {status}): {body}");
        }
        let posts: Vec<InstagramPost> = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parsing apify dataset")?;

        let now = Utc::now();
        let topics = normalize_instagram(posts, &hashtag, now - time_range.duration(), now);
        counter!(TOPICS_FETCHED_TOTAL, "platform" => "instagram").increment(topics.len() as u64);
        Ok(topics)
    }

    fn platform(&self) -> Platform {
        Platform::Instagram
    }

    fn is_configured(&self) -> bool {
        self.token.is_some()
    }
}
