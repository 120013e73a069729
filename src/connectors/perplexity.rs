// src/connectors/perplexity.rs
//! Trending topics from Perplexity's search-grounded chat completions.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, PlatformConnector};
use crate::discovery::TimeRange;
use crate::metrics::TOPICS_FETCHED_TOTAL;
use crate::topic::{Platform, TrendingTopic};

pub const PERPLEXITY_API_URL: &str = "https://api.perplexity.ai";
const MAX_TOPICS: usize = 10;

/// One entry of the JSON array the model is asked to return.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PerplexityTopic {
    pub title: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: Option<String>,
}

/// Earlier answers rank higher: `max(0, 100 - 10 * position)`.
pub fn position_score(position: usize) -> f64 {
    (100.0 - 10.0 * position as f64).max(0.0)
}

/// Pull the first topic array out of a model answer (plain, fenced, or wrapped
/// in prose). Citation markers such as `[1]` before or after it are skipped.
pub fn extract_topics(content: &str) -> Result<Vec<PerplexityTopic>> {
    let mut last_err = None;
    for (start, _) in content.match_indices('[') {
        let mut stream =
            serde_json::Deserializer::from_str(&content[start..]).into_iter::<Vec<PerplexityTopic>>();
        match stream.next() {
            Some(Ok(items)) => return Ok(items),
            Some(Err(e)) => last_err = Some(e),
            None => {}
        }
    }
    match last_err {
        Some(e) => Err(e).context("malformed perplexity topic array"),
        None => Err(anyhow!("perplexity answer contains no JSON array")),
    }
}

pub fn normalize_perplexity(
    items: Vec<PerplexityTopic>,
    citations: &[String],
    keyword: &str,
    now: DateTime<Utc>,
) -> Vec<TrendingTopic> {
    items
        .into_iter()
        .filter(|it| !it.title.trim().is_empty())
        .take(MAX_TOPICS)
        .enumerate()
        .map(|(pos, it)| {
            let url = it
                .url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .or_else(|| citations.get(pos).cloned())
                .unwrap_or_default();
            let theme = if it.theme.trim().is_empty() {
                keyword
            } else {
                it.theme.as_str()
            };
            let raw = serde_json::to_value(&it).unwrap_or(serde_json::Value::Null);
            TrendingTopic::new(
                Platform::Perplexity,
                &format!("{pos}"),
                &it.title,
                theme,
                &it.summary,
                url,
                position_score(pos),
                now,
            )
            .with_raw_data(raw)
        })
        .collect()
}

pub struct PerplexityConnector {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl PerplexityConnector {
    pub fn new(api_key: Option<String>) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(45))?,
            api_key,
            base_url: PERPLEXITY_API_URL.to_string(),
            model: "sonar".to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: String,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: Vec<Msg<'a>>,
    search_recency_filter: &'a str,
    temperature: f32,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
    #[serde(default)]
    citations: Vec<String>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}

#[derive(Deserialize)]
struct ChoiceMsg {
    content: String,
}

#[async_trait]
impl PlatformConnector for PerplexityConnector {
    async fn discover_by_keyword(
        &self,
        keyword: &str,
        time_range: TimeRange,
    ) -> Result<Vec<TrendingTopic>> {
        let Some(key) = self.api_key.as_deref() else {
            tracing::debug!(platform = "perplexity", "no API key; skipping");
            return Ok(Vec::new());
        };

        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: "You find trending discussions on the web. Answer ONLY with a JSON array \
                              of objects {\"title\", \"theme\", \"summary\", \"url\"}, most trending first."
                        .to_string(),
                },
                Msg {
                    role: "user",
                    content: format!(
                        "List up to {MAX_TOPICS} trending topics about \"{keyword}\" from the past {}.",
                        time_range.as_str()
                    ),
                },
            ],
            search_recency_filter: time_range.as_str(),
            temperature: 0.2,
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(key)
            .json(&req)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("perplexity request")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("perplexity error ({status}): {body}");
        }
        let body: Resp = resp
            .json()
            .await
            .map_err(reqwest::Error::without_url)
            .context("parsing perplexity response")?;
        let content = body
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| anyhow!("perplexity returned no choices"))?;

        let items = extract_topics(content)?;
        let topics = normalize_perplexity(items, &body.citations, keyword, Utc::now());
        counter!(TOPICS_FETCHED_TOTAL, "platform" => "perplexity").increment(topics.len() as u64);
        Ok(topics)
    }

    fn platform(&self) -> Platform {
        Platform::Perplexity
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
