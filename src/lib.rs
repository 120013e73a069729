// src/lib.rs
//! Trending-topic discovery: fan a keyword out to several platforms, keep the
//! semantically relevant results, rank them and attach AI briefings.
//!
//! ```ignore
//! let cfg = DiscoveryConfig::load_default()?;
//! let discovery = TrendDiscovery::from_config(&cfg, &Credentials::from_env())?;
//! let result = discovery
//!     .discover(DiscoveryOptions::new("ai marketing").max_results(5))
//!     .await?;
//! ```

pub mod config;
pub mod connectors;
pub mod discovery;
pub mod enrich;
pub mod metrics;
pub mod rank;
pub mod similarity;
pub mod telemetry;
pub mod topic;

// ---- Re-exports for stable public API ----
pub use crate::config::{Credentials, DiscoveryConfig};
pub use crate::connectors::{DynConnector, PlatformConnector};
pub use crate::discovery::{
    Capabilities, DiscoveryError, DiscoveryMetadata, DiscoveryOptions, DiscoveryResult,
    TimeRange, TrendDiscovery, DEFAULT_MAX_RESULTS, DEFAULT_MIN_SIMILARITY,
};
pub use crate::enrich::{BriefingEnricher, BriefingProvider, BriefingRequest, BriefingResponse};
pub use crate::rank::Ranker;
pub use crate::similarity::{cosine_similarity, EmbeddingProvider, SimilarityFilter};
pub use crate::topic::{Briefing, Platform, TrendingTopic};
