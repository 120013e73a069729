// src/discovery/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::topic::{Platform, TrendingTopic};

pub const DEFAULT_MAX_RESULTS: usize = 10;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Day,
    #[default]
    Week,
    Month,
}

impl TimeRange {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Day => "day",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        match self {
            TimeRange::Day => chrono::Duration::days(1),
            TimeRange::Week => chrono::Duration::days(7),
            TimeRange::Month => chrono::Duration::days(30),
        }
    }
}

impl std::str::FromStr for TimeRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(TimeRange::Day),
            "week" => Ok(TimeRange::Week),
            "month" => Ok(TimeRange::Month),
            other => anyhow::bail!("unknown time range: {other}"),
        }
    }
}

/// Request for one discovery run. Missing JSON fields take the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryOptions {
    pub keyword: String,
    pub platforms: Vec<Platform>,
    pub time_range: TimeRange,
    pub max_results: usize,
    pub min_similarity: f32,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            platforms: Platform::ALL.to_vec(),
            time_range: TimeRange::default(),
            max_results: DEFAULT_MAX_RESULTS,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

impl DiscoveryOptions {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            ..Self::default()
        }
    }

    pub fn platforms(mut self, platforms: impl IntoIterator<Item = Platform>) -> Self {
        self.platforms = platforms.into_iter().collect();
        self
    }

    pub fn time_range(mut self, range: TimeRange) -> Self {
        self.time_range = range;
        self
    }

    pub fn max_results(mut self, n: usize) -> Self {
        self.max_results = n;
        self
    }

    pub fn min_similarity(mut self, s: f32) -> Self {
        self.min_similarity = s;
        self
    }

    /// Reject contract violations before any I/O.
    pub fn validate(&self) -> Result<(), DiscoveryError> {
        if self.keyword.trim().is_empty() {
            return Err(DiscoveryError::EmptyKeyword);
        }
        if self.platforms.is_empty() {
            return Err(DiscoveryError::NoPlatforms);
        }
        if self.max_results == 0 {
            return Err(DiscoveryError::ZeroMaxResults);
        }
        if !self.min_similarity.is_finite() || !(0.0..=1.0).contains(&self.min_similarity) {
            return Err(DiscoveryError::InvalidMinSimilarity(self.min_similarity));
        }
        Ok(())
    }

    /// Requested platforms without duplicates, in request order.
    pub fn unique_platforms(&self) -> Vec<Platform> {
        let mut out: Vec<Platform> = Vec::with_capacity(self.platforms.len());
        for p in &self.platforms {
            if !out.contains(p) {
                out.push(*p);
            }
        }
        out
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum DiscoveryError {
    #[error("keyword must not be empty")]
    EmptyKeyword,

    #[error("at least one platform must be requested")]
    NoPlatforms,

    #[error("maxResults must be positive")]
    ZeroMaxResults,

    #[error("minSimilarity must be within 0..=1, got {0}")]
    InvalidMinSimilarity(f32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryMetadata {
    pub total_fetched: usize,
    pub after_filtering: usize,
    pub platforms_searched: Vec<Platform>,
    /// Wall-clock milliseconds.
    pub search_time: u64,
    pub platform_counts: BTreeMap<Platform, usize>,
    /// Absent on a clean run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform_errors: Option<BTreeMap<Platform, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryResult {
    pub topics: Vec<TrendingTopic>,
    pub metadata: DiscoveryMetadata,
}
