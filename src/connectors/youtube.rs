// src/connectors/youtube.rs
//! YouTube Data API v3: keyword search plus a statistics lookup for engagement.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use metrics::counter;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::{http_client, log_scale, PlatformConnector};
use crate::config::YoutubeEngagementConfig;
use crate::discovery::TimeRange;
use crate::metrics::TOPICS_FETCHED_TOTAL;
use crate::topic::{Platform, TrendingTopic};

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
/// The key travels in this header, never in the URL.
const API_KEY_HEADER: &str = "X-Goog-Api-Key";

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchId,
    pub snippet: Snippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchId {
    pub video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct VideosResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    pub id: String,
    #[serde(default)]
    pub statistics: Statistics,
}

/// The API returns counts as decimal strings.
#[derive(Debug, Default, Clone, Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub view_count: Option<String>,
    pub like_count: Option<String>,
    pub comment_count: Option<String>,
}

impl Statistics {
    fn count(v: &Option<String>) -> f64 {
        v.as_deref()
            .and_then(|s| s.parse::<u64>().ok())
            .map(|n| n as f64)
            .unwrap_or(0.0)
    }
}

/// Weighted log-scaled blend of views, likes and comments.
pub fn engagement_score(stats: &Statistics, w: &YoutubeEngagementConfig) -> f64 {
    w.scale
        * (w.views * log_scale(Statistics::count(&stats.view_count))
            + w.likes * log_scale(Statistics::count(&stats.like_count))
            + w.comments * log_scale(Statistics::count(&stats.comment_count)))
}

/// Map a search page (+ optional statistics) to topics. Items without a video
/// id or title are skipped.
pub fn normalize_youtube(
    search: SearchResponse,
    stats: &HashMap<String, Statistics>,
    weights: &YoutubeEngagementConfig,
    now: DateTime<Utc>,
) -> Vec<TrendingTopic> {
    let mut out = Vec::with_capacity(search.items.len());
    for item in search.items {
        let Some(video_id) = item.id.video_id else {
            continue;
        };
        if item.snippet.title.trim().is_empty() {
            continue;
        }
        let st = stats.get(&video_id).cloned().unwrap_or_default();
        let raw = serde_json::json!({
            "videoId": video_id,
            "channelTitle": item.snippet.channel_title,
            "statistics": st,
        });
        out.push(
            TrendingTopic::new(
                Platform::Youtube,
                &video_id,
                &item.snippet.title,
                &item.snippet.channel_title,
                &item.snippet.description,
                format!("https://www.youtube.com/watch?v={video_id}"),
                engagement_score(&st, weights),
                item.snippet.published_at.unwrap_or(now),
            )
            .with_raw_data(raw),
        );
    }
    out
}

pub struct YoutubeConnector {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    max_results: u32,
    weights: YoutubeEngagementConfig,
}

impl YoutubeConnector {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(15))?,
            api_key,
            base_url: YOUTUBE_API_URL.to_string(),
            max_results: 25,
            weights: YoutubeEngagementConfig::default(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_max_results(mut self, n: u32) -> Self {
        self.max_results = n.clamp(1, 50);
        self
    }

    pub fn with_weights(mut self, w: YoutubeEngagementConfig) -> Self {
        self.weights = w;
        self
    }

    async fn search(&self, key: &str, keyword: &str, after: DateTime<Utc>) -> Result<SearchResponse> {
        let max = self.max_results.to_string();
        let after = after.to_rfc3339_opts(SecondsFormat::Secs, true);
        let resp = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("order", "viewCount"),
                ("q", keyword),
                ("publishedAfter", after.as_str()),
                ("maxResults", max.as_str()),
            ])
            .header(API_KEY_HEADER, key)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("youtube search request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("youtube search error ({status}): {body}");
        }
        resp.json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parsing youtube search response")
    }

    async fn statistics(&self, key: &str, ids: &[String]) -> Result<HashMap<String, Statistics>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let joined = ids.join(",");
        let resp = self
            .http
            .get(format!("{}/videos", self.base_url))
            .query(&[("part", "statistics"), ("id", joined.as_str())])
            .header(API_KEY_HEADER, key)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("youtube videos request")?;
        let status = resp.status();
        if !status.is_success() {
            anyhow::bail!("youtube videos error ({status})");
        }
        let body: VideosResponse = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parsing youtube videos response")?;
        Ok(body
            .items
            .into_iter()
            .map(|v| (v.id, v.statistics))
            .collect())
    }
}

#[async_trait]
impl PlatformConnector for YoutubeConnector {
    async fn discover_by_keyword(
        &self,
        keyword: &str,
        time_range: TimeRange,
    ) -> Result<Vec<TrendingTopic>> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!(platform = "youtube", "no API key; skipping");
            return Ok(Vec::new());
        };

        let now = Utc::now();
        let search = self.search(key, keyword, now - time_range.duration()).await?;
        let ids: Vec<String> = search
            .items
            .iter()
            .filter_map(|i| i.id.video_id.clone())
            .collect();

        // Missing statistics only cost engagement, not the topics themselves.
        let stats = match self.statistics(key, &ids).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(platform = "youtube", error = %e, "statistics unavailable");
                HashMap::new()
            }
        };

        let topics = normalize_youtube(search, &stats, &self.weights, now);
        counter!(TOPICS_FETCHED_TOTAL, "platform" => "youtube").increment(topics.len() as u64);
        Ok(topics)
    }

    fn platform(&self) -> Platform {
        Platform::Youtube
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
