// src/rank.rs
//! Ranking: composite engagement/relevance score, stable descending order.
//!
//! score = engagement * w_engagement + similarity * scale * w_similarity
//!
//! Missing similarity counts as 0. The score is only used for ordering and is
//! never written back to the topic.

use crate::config::RankingConfig;
use crate::topic::TrendingTopic;
use std::cmp::Ordering;

pub const DEFAULT_ENGAGEMENT_WEIGHT: f64 = 0.6;
pub const DEFAULT_SIMILARITY_WEIGHT: f64 = 0.4;
pub const DEFAULT_SIMILARITY_SCALE: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranker {
    pub w_engagement: f64,
    pub w_similarity: f64,
    pub similarity_scale: f64,
}

impl Default for Ranker {
    fn default() -> Self {
        Self {
            w_engagement: DEFAULT_ENGAGEMENT_WEIGHT,
            w_similarity: DEFAULT_SIMILARITY_WEIGHT,
            similarity_scale: DEFAULT_SIMILARITY_SCALE,
        }
    }
}

impl From<&RankingConfig> for Ranker {
    fn from(c: &RankingConfig) -> Self {
        Self {
            w_engagement: c.engagement_weight,
            w_similarity: c.similarity_weight,
            similarity_scale: c.similarity_scale,
        }
    }
}

impl Ranker {
    pub fn score(&self, topic: &TrendingTopic) -> f64 {
        let sim = topic.similarity.unwrap_or(0.0) as f64;
        topic.metrics.engagement_score * self.w_engagement
            + sim * self.similarity_scale * self.w_similarity
    }

    /// Returns a new Vec sorted by score, highest first. Equal scores keep
    /// their input order (`sort_by` is stable).
    pub fn rank(&self, topics: Vec<TrendingTopic>) -> Vec<TrendingTopic> {
        let mut scored: Vec<(f64, TrendingTopic)> =
            topics.into_iter().map(|t| (self.score(&t), t)).collect();
        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));
        scored.into_iter().map(|(_, t)| t).collect()
    }
}

/// Rank with the default weights.
pub fn rank_topics(topics: Vec<TrendingTopic>) -> Vec<TrendingTopic> {
    Ranker::default().rank(topics)
}
