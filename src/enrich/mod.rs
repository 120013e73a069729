// src/enrich/mod.rs
//! Briefing enrichment in rate-limited batches.
//!
//! Batches run one after another with a fixed pause between them; topics inside
//! a batch are enriched concurrently and settle independently. The output has
//! the same length and order as the input. Failures become empty briefings.

pub mod ai_adapter;

pub use ai_adapter::{
    build_briefing_provider, BriefingProvider, BriefingRequest, BriefingResponse,
    DisabledBriefingProvider, DynBriefingProvider, MockBriefingProvider, OpenAiBriefingProvider,
    ENV_AI_TEST_MODE,
};

use crate::config::EnrichmentConfig;
use crate::metrics::ENRICHMENT_FAILURES_TOTAL;
use crate::topic::{Briefing, TrendingTopic};
use futures::future::join_all;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BATCH_SIZE: usize = 5;
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(1000);

pub struct BriefingEnricher {
    provider: DynBriefingProvider,
    batch_size: usize,
    batch_delay: Duration,
}

impl BriefingEnricher {
    pub fn new(provider: DynBriefingProvider) -> Self {
        Self {
            provider,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }

    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledBriefingProvider))
    }

    pub fn from_config(provider: DynBriefingProvider, cfg: &EnrichmentConfig) -> Self {
        Self::new(provider)
            .with_batch_size(cfg.batch_size)
            .with_batch_delay(Duration::from_millis(cfg.batch_delay_ms))
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n.max(1);
        self
    }

    pub fn with_batch_delay(mut self, d: Duration) -> Self {
        self.batch_delay = d;
        self
    }

    pub fn is_active(&self) -> bool {
        self.provider.is_configured()
    }

    pub async fn enrich_batch(&self, topics: Vec<TrendingTopic>) -> Vec<TrendingTopic> {
        if !self.provider.is_configured() {
            tracing::debug!(
                topics = topics.len(),
                "briefing provider not configured; returning empty briefings"
            );
            return topics
                .into_iter()
                .map(|t| t.with_briefing(Briefing::empty()))
                .collect();
        }

        let mut out = Vec::with_capacity(topics.len());
        let mut rest = topics;
        let mut batch_no = 0usize;
        while !rest.is_empty() {
            if batch_no > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }
            let tail = rest.split_off(self.batch_size.min(rest.len()));
            let batch = std::mem::replace(&mut rest, tail);

            let briefings = join_all(batch.iter().map(|t| self.enrich_one(t))).await;
            out.extend(
                batch
                    .into_iter()
                    .zip(briefings)
                    .map(|(t, b)| t.with_briefing(b)),
            );
            batch_no += 1;
        }

        tracing::debug!(
            batches = batch_no,
            topics = out.len(),
            provider = self.provider.provider_name(),
            "enrichment finished"
        );
        out
    }

    async fn enrich_one(&self, topic: &TrendingTopic) -> Briefing {
        let request = BriefingRequest::from_topic(topic);
        let result = self
            .provider
            .generate(&request)
            .await
            .and_then(BriefingResponse::into_briefing);
        match result {
            Ok(b) => b,
            Err(e) => {
                tracing::warn!(
                    topic = %topic.id,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "briefing failed; using empty defaults"
                );
                counter!(ENRICHMENT_FAILURES_TOTAL).increment(1);
                Briefing::empty()
            }
        }
    }
}
