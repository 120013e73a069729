// src/similarity/mod.rs
//! Semantic relevance filter.
//!
//! - One embedding for the keyword, one per topic (`"{title} {context}"`, cut
//!   to `max_input_chars`).
//! - Cosine similarity, clamped into `[0, 1]` before it is stored on the topic.
//! - Degraded mode: when a vector is missing (provider off, call failed,
//!   dimension mismatch) the topic gets `similarity = 1.0` and passes.

pub mod embeddings;

pub use embeddings::{DisabledEmbeddings, DynEmbeddings, EmbeddingProvider, OpenAiEmbeddings};

use crate::metrics::EMBEDDING_FALLBACK_TOTAL;
use crate::topic::{truncate_chars, TrendingTopic};
use metrics::counter;
use std::sync::Arc;

pub const DEFAULT_MAX_INPUT_CHARS: usize = 500;

/// Similarity assigned when no comparison was possible.
pub const PASS_THROUGH_SIMILARITY: f32 = 1.0;

/// `dot(a,b) / (|a| * |b|)`; 0 for zero-magnitude or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    ((dot / denom) as f32).clamp(-1.0, 1.0)
}

/// Text submitted for a topic's embedding.
pub fn embedding_input(topic: &TrendingTopic, max_chars: usize) -> String {
    let joined = if topic.context.is_empty() {
        topic.title.clone()
    } else {
        format!("{} {}", topic.title, topic.context)
    };
    truncate_chars(&joined, max_chars)
}

pub struct SimilarityFilter {
    embeddings: DynEmbeddings,
    max_input_chars: usize,
}

impl SimilarityFilter {
    pub fn new(embeddings: DynEmbeddings) -> Self {
        Self {
            embeddings,
            max_input_chars: DEFAULT_MAX_INPUT_CHARS,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledEmbeddings))
    }

    pub fn with_max_input_chars(mut self, n: usize) -> Self {
        self.max_input_chars = n.max(1);
        self
    }

    pub fn is_active(&self) -> bool {
        self.embeddings.is_configured()
    }

    /// Score every topic against `keyword` and keep those with
    /// `similarity >= threshold`, preserving input order.
    pub async fn filter_by_similarity(
        &self,
        topics: Vec<TrendingTopic>,
        keyword: &str,
        threshold: f32,
    ) -> Vec<TrendingTopic> {
        if topics.is_empty() {
            return topics;
        }

        if !self.embeddings.is_configured() {
            tracing::debug!(
                topics = topics.len(),
                "embeddings not configured; similarity filter passes everything"
            );
            counter!(EMBEDDING_FALLBACK_TOTAL).increment(topics.len() as u64);
            return topics
                .into_iter()
                .map(|t| t.with_similarity(PASS_THROUGH_SIMILARITY))
                .collect();
        }

        let Some(kw_vec) = self.embeddings.embed_query(keyword).await else {
            tracing::warn!(
                provider = self.embeddings.name(),
                topics = topics.len(),
                "keyword embedding unavailable; passing all topics through"
            );
            counter!(EMBEDDING_FALLBACK_TOTAL).increment(topics.len() as u64);
            return topics
                .into_iter()
                .map(|t| t.with_similarity(PASS_THROUGH_SIMILARITY))
                .collect();
        };

        let texts: Vec<String> = topics
            .iter()
            .map(|t| embedding_input(t, self.max_input_chars))
            .collect();
        let mut vectors = self.embeddings.embed_batch(&texts).await;
        vectors.resize(topics.len(), None);

        let mut fallbacks = 0u64;
        let mut kept = Vec::with_capacity(topics.len());
        for (topic, vec) in topics.into_iter().zip(vectors) {
            let sim = match vec {
                Some(v) if v.len() == kw_vec.len() => cosine_similarity(&kw_vec, &v).max(0.0),
                Some(v) => {
                    tracing::warn!(
                        topic = %topic.id,
                        expected = kw_vec.len(),
                        got = v.len(),
                        "embedding dimension mismatch; passing topic through"
                    );
                    fallbacks += 1;
                    PASS_THROUGH_SIMILARITY
                }
                None => {
                    fallbacks += 1;
                    PASS_THROUGH_SIMILARITY
                }
            };
            if sim >= threshold {
                kept.push(topic.with_similarity(sim));
            }
        }

        if fallbacks > 0 {
            counter!(EMBEDDING_FALLBACK_TOTAL).increment(fallbacks);
        }
        kept
    }
}
