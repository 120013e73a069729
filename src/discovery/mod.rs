// src/discovery/mod.rs
//! # Discovery Orchestrator
//!
//! keyword + options → parallel connector calls → aggregate → similarity filter
//! → rank → truncate → briefings → `DiscoveryResult`.
//!
//! A single connector, embedding or briefing failure never fails the run; it
//! shows up as fewer topics and, for connectors, an entry in `platformErrors`.
//! The only error `discover` returns is an invalid `DiscoveryOptions`.

pub mod types;

pub use types::{
    DiscoveryError, DiscoveryMetadata, DiscoveryOptions, DiscoveryResult, TimeRange,
    DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY,
};

use futures::future::join_all;
use metrics::{counter, histogram};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{Credentials, DiscoveryConfig};
use crate::connectors::{
    DynConnector, InstagramConnector, PerplexityConnector, YoutubeConnector,
};
use crate::enrich::{build_briefing_provider, BriefingEnricher};
use crate::metrics::{ensure_metrics_described, PLATFORM_ERRORS_TOTAL, RUNS_TOTAL, SEARCH_MS};
use crate::rank::Ranker;
use crate::similarity::{DisabledEmbeddings, DynEmbeddings, OpenAiEmbeddings, SimilarityFilter};
use crate::topic::{resuffix_topic_id, Platform, TrendingTopic};

pub const DEFAULT_CONNECTOR_TIMEOUT: Duration = Duration::from_secs(30);

/// Which optional capabilities are live (credentials present).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    pub platforms: BTreeMap<Platform, bool>,
    pub embeddings: bool,
    pub briefings: bool,
}

pub struct TrendDiscovery {
    connectors: Vec<DynConnector>,
    similarity: SimilarityFilter,
    ranker: Ranker,
    enricher: BriefingEnricher,
    connector_timeout: Duration,
}

impl Default for TrendDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendDiscovery {
    /// No connectors, embeddings and briefings off, default ranking.
    pub fn new() -> Self {
        Self {
            connectors: Vec::new(),
            similarity: SimilarityFilter::disabled(),
            ranker: Ranker::default(),
            enricher: BriefingEnricher::disabled(),
            connector_timeout: DEFAULT_CONNECTOR_TIMEOUT,
        }
    }

    /// Wire the HTTP connectors and providers from config + credentials.
    /// Anything without credentials is built in its degraded form.
    pub fn from_config(cfg: &DiscoveryConfig, creds: &Credentials) -> anyhow::Result<Self> {
        let youtube = YoutubeConnector::new(creds.youtube_api_key.clone())?
            .with_max_results(cfg.connectors.youtube_max_results)
            .with_weights(cfg.youtube_engagement);
        let instagram = InstagramConnector::new(creds.apify_api_token.clone())?
            .with_results_limit(cfg.connectors.instagram_results_limit);
        let perplexity = PerplexityConnector::new(creds.perplexity_api_key.clone())?
            .with_model(cfg.connectors.perplexity_model.clone());

        let embeddings: DynEmbeddings = match &creds.openai_api_key {
            Some(key) => Arc::new(OpenAiEmbeddings::new(
                Some(key.clone()),
                cfg.similarity.embedding_model.clone(),
            )?),
            None => Arc::new(DisabledEmbeddings),
        };
        let briefing = build_briefing_provider(creds.openai_api_key.clone(), &cfg.enrichment.model);

        Ok(Self::new()
            .with_connector(Arc::new(youtube))
            .with_connector(Arc::new(instagram))
            .with_connector(Arc::new(perplexity))
            .with_similarity_filter(
                SimilarityFilter::new(embeddings).with_max_input_chars(cfg.similarity.max_input_chars),
            )
            .with_ranker(Ranker::from(&cfg.ranking))
            .with_enricher(BriefingEnricher::from_config(briefing, &cfg.enrichment))
            .with_connector_timeout(Duration::from_secs(cfg.connectors.timeout_secs)))
    }

    /// Register a connector; replaces any earlier one for the same platform.
    pub fn with_connector(mut self, connector: DynConnector) -> Self {
        let p = connector.platform();
        self.connectors.retain(|c| c.platform() != p);
        self.connectors.push(connector);
        self
    }

    pub fn with_similarity_filter(mut self, filter: SimilarityFilter) -> Self {
        self.similarity = filter;
        self
    }

    pub fn with_embeddings(self, embeddings: DynEmbeddings) -> Self {
        self.with_similarity_filter(SimilarityFilter::new(embeddings))
    }

    pub fn with_ranker(mut self, ranker: Ranker) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn with_enricher(mut self, enricher: BriefingEnricher) -> Self {
        self.enricher = enricher;
        self
    }

    pub fn with_connector_timeout(mut self, timeout: Duration) -> Self {
        self.connector_timeout = timeout;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        let platforms = Platform::ALL
            .iter()
            .map(|&p| {
                let live = self.connector_for(p).is_some_and(|c| c.is_configured());
                (p, live)
            })
            .collect();
        Capabilities {
            platforms,
            embeddings: self.similarity.is_active(),
            briefings: self.enricher.is_active(),
        }
    }

    fn connector_for(&self, platform: Platform) -> Option<&DynConnector> {
        self.connectors.iter().find(|c| c.platform() == platform)
    }

    pub async fn discover(
        &self,
        options: DiscoveryOptions,
    ) -> Result<DiscoveryResult, DiscoveryError> {
        options.validate()?;
        ensure_metrics_described();
        let started = Instant::now();

        let keyword = options.keyword.trim();
        let platforms = options.unique_platforms();

        // 1) Fan out and wait for every outcome.
        let calls = platforms
            .iter()
            .map(|&p| self.fetch_platform(p, keyword, options.time_range));
        let outcomes = join_all(calls).await;

        // 2) Aggregate in request order.
        let mut aggregate: Vec<TrendingTopic> = Vec::new();
        let mut platform_counts = BTreeMap::new();
        let mut platform_errors = BTreeMap::new();
        let mut seen_ids = HashSet::new();
        for (platform, outcome) in platforms.iter().copied().zip(outcomes) {
            match outcome {
                Ok(topics) => {
                    platform_counts.insert(platform, topics.len());
                    for mut t in topics {
                        while !seen_ids.insert(t.id.clone()) {
                            t.id = resuffix_topic_id(&t.id);
                        }
                        aggregate.push(t);
                    }
                }
                Err(msg) => {
                    tracing::warn!(target: "discovery", %platform, error = %msg, "connector failed");
                    counter!(PLATFORM_ERRORS_TOTAL, "platform" => platform.as_str()).increment(1);
                    platform_errors.insert(platform, msg);
                }
            }
        }
        let total_fetched = aggregate.len();

        // 3) Relevance filter.
        let filtered = self
            .similarity
            .filter_by_similarity(aggregate, keyword, options.min_similarity)
            .await;
        let after_filtering = filtered.len();

        // 4) Rank + stable truncate.
        let mut ranked = self.ranker.rank(filtered);
        ranked.truncate(options.max_results);

        // 5) Briefings.
        let topics = self.enricher.enrich_batch(ranked).await;

        let search_time = started.elapsed().as_millis() as u64;
        counter!(RUNS_TOTAL).increment(1);
        histogram!(SEARCH_MS).record(search_time as f64);

        tracing::info!(
            target: "discovery",
            keyword,
            total_fetched,
            after_filtering,
            returned = topics.len(),
            failed_platforms = platform_errors.len(),
            search_ms = search_time,
            "discovery finished"
        );

        Ok(DiscoveryResult {
            topics,
            metadata: DiscoveryMetadata {
                total_fetched,
                after_filtering,
                platforms_searched: platforms,
                search_time,
                platform_counts,
                platform_errors: (!platform_errors.is_empty()).then_some(platform_errors),
            },
        })
    }

    /// One connector call, bounded by the connector timeout. Every failure mode
    /// collapses into an error message.
    async fn fetch_platform(
        &self,
        platform: Platform,
        keyword: &str,
        range: TimeRange,
    ) -> Result<Vec<TrendingTopic>, String> {
        let Some(connector) = self.connector_for(platform) else {
            return Err(format!("no connector registered for {platform}"));
        };
        let t0 = Instant::now();
        match tokio::time::timeout(
            self.connector_timeout,
            connector.discover_by_keyword(keyword, range),
        )
        .await
        {
            Ok(Ok(topics)) => {
                tracing::debug!(
                    target: "discovery",
                    %platform,
                    count = topics.len(),
                    ms = t0.elapsed().as_millis() as u64,
                    "connector finished"
                );
                Ok(topics)
            }
            Ok(Err(e)) => Err(format!("{e:#}")),
            Err(_) => Err(format!(
                "timed out after {} ms",
                self.connector_timeout.as_millis()
            )),
        }
    }
}
