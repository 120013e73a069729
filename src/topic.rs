// src/topic.rs
//! Canonical topic model shared by every pipeline stage.
//!
//! Connectors build `TrendingTopic`s from their native payloads; the similarity
//! filter and the enricher only *add* fields through consuming transitions
//! (`with_similarity`, `with_briefing`), so a topic is never edited in place.

use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Max characters kept in `TrendingTopic::context`.
pub const MAX_CONTEXT_CHARS: usize = 1000;

/// Supported external sources. The set is fixed; `source.platform` is the tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Instagram,
    Perplexity,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Youtube, Platform::Instagram, Platform::Perplexity];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Instagram => "instagram",
            Platform::Perplexity => "perplexity",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" | "video" => Ok(Platform::Youtube),
            "instagram" | "photo" => Ok(Platform::Instagram),
            "perplexity" | "web" | "search" => Ok(Platform::Perplexity),
            other => anyhow::bail!("unknown platform: {other}"),
        }
    }
}

/// Where a topic came from. `raw_data` is kept for debugging only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSource {
    pub platform: Platform,
    pub url: String,
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicMetrics {
    /// Platform-specific scale; not comparable across platforms.
    pub engagement_score: f64,
    pub recency: DateTime<Utc>,
}

/// AI-generated summary attached by the enricher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Briefing {
    pub briefing: String,
    pub key_points: Vec<String>,
    pub suggested_angles: Vec<String>,
    pub target_audience: Option<String>,
}

impl Briefing {
    /// Degraded-mode value: empty text and lists.
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopic {
    pub id: String,
    pub title: String,
    pub theme: String,
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_audience: Option<String>,
    pub source: TopicSource,
    pub metrics: TopicMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub briefing: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_angles: Option<Vec<String>>,
}

impl TrendingTopic {
    /// Build a fresh topic. Text fields are normalized and the id gets a random
    /// suffix so two connectors can never collide within one run.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        platform: Platform,
        native_id: &str,
        title: &str,
        theme: &str,
        context: &str,
        url: impl Into<String>,
        engagement_score: f64,
        recency: DateTime<Utc>,
    ) -> Self {
        Self {
            id: make_topic_id(platform, native_id),
            title: normalize_text(title, MAX_CONTEXT_CHARS),
            theme: normalize_text(theme, MAX_CONTEXT_CHARS),
            context: normalize_text(context, MAX_CONTEXT_CHARS),
            target_audience: None,
            source: TopicSource {
                platform,
                url: url.into(),
                raw_data: serde_json::Value::Null,
            },
            metrics: TopicMetrics {
                engagement_score: sanitize_engagement(engagement_score),
                recency,
            },
            similarity: None,
            briefing: None,
            key_points: None,
            suggested_angles: None,
        }
    }

    pub fn with_raw_data(mut self, raw: serde_json::Value) -> Self {
        self.source.raw_data = raw;
        self
    }

    pub fn with_similarity(mut self, similarity: f32) -> Self {
        self.similarity = Some(similarity);
        self
    }

    /// Attach (or replace) the briefing fields. Last write wins.
    pub fn with_briefing(mut self, b: Briefing) -> Self {
        self.briefing = Some(b.briefing);
        self.key_points = Some(b.key_points);
        self.suggested_angles = Some(b.suggested_angles);
        self.target_audience = b.target_audience.filter(|a| !a.trim().is_empty());
        self
    }

    pub fn platform(&self) -> Platform {
        self.source.platform
    }
}

/// `"{platform}-{native}-{8 hex}"`. Native-id chars outside `[A-Za-z0-9-]` become `_`.
pub fn make_topic_id(platform: Platform, native_id: &str) -> String {
    let native: String = native_id
        .chars()
        .take(64)
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let suffix: u32 = rand::rng().random();
    if native.is_empty() {
        format!("{}-{:08x}", platform, suffix)
    } else {
        format!("{}-{}-{:08x}", platform, native, suffix)
    }
}

/// Same id with a fresh random suffix; the platform and native parts stay.
pub fn resuffix_topic_id(id: &str) -> String {
    let base = id
        .rsplit_once('-')
        .filter(|(_, s)| s.len() == 8 && s.chars().all(|c| c.is_ascii_hexdigit()))
        .map_or(id, |(base, _)| base);
    let suffix: u32 = rand::rng().random();
    format!("{base}-{suffix:08x}")
}

fn sanitize_engagement(x: f64) -> f64 {
    if x.is_finite() {
        x.max(0.0)
    } else {
        0.0
    }
}

/// Normalize text: decode entities, strip tags, unify quotes, collapse
/// whitespace, cap at `max_chars`.
pub fn normalize_text(s: &str, max_chars: usize) -> String {
    let mut out = html_escape::decode_html_entities(s).to_string();

    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    truncate_chars(&out, max_chars)
}

/// Char-boundary safe truncation.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
