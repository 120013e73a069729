// src/config/mod.rs
//! Discovery configuration: tunable constants (TOML) + credentials (env).
//!
//! Lookup order for the TOML file:
//! 1) `$DISCOVERY_CONFIG_PATH`
//! 2) `config/discovery.toml`
//! 3) built-in defaults
//!
//! Every section is optional; missing keys keep their defaults and out-of-range
//! values are reset to defaults by `sanitize()`.

pub mod credentials;

pub use credentials::Credentials;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_CONFIG_PATH: &str = "DISCOVERY_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/discovery.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub ranking: RankingConfig,
    pub similarity: SimilarityConfig,
    pub enrichment: EnrichmentConfig,
    pub connectors: ConnectorsConfig,
    pub youtube_engagement: YoutubeEngagementConfig,
}

/// `score = engagement * engagement_weight + similarity * similarity_scale * similarity_weight`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub engagement_weight: f64,
    pub similarity_weight: f64,
    pub similarity_scale: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            engagement_weight: 0.6,
            similarity_weight: 0.4,
            similarity_scale: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Topic text is cut to this many chars before embedding.
    pub max_input_chars: usize,
    pub embedding_model: String,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 500,
            embedding_model: "text-embedding-3-small".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub model: String,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay_ms: 1000,
            model: "gpt-4o-mini".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorsConfig {
    /// Per-connector ceiling enforced by the orchestrator.
    pub timeout_secs: u64,
    pub youtube_max_results: u32,
    pub instagram_results_limit: u32,
    pub perplexity_model: String,
}

impl Default for ConnectorsConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            youtube_max_results: 25,
            instagram_results_limit: 30,
            perplexity_model: "sonar".to_string(),
        }
    }
}

/// `scale * (views*log10(v+1) + likes*log10(l+1) + comments*log10(c+1))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeEngagementConfig {
    pub scale: f64,
    pub views: f64,
    pub likes: f64,
    pub comments: f64,
}

impl Default for YoutubeEngagementConfig {
    fn default() -> Self {
        Self {
            scale: 10.0,
            views: 0.6,
            likes: 0.25,
            comments: 0.15,
        }
    }
}

impl DiscoveryConfig {
    /// Load from an explicit TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading discovery config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing discovery config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: DiscoveryConfig = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    /// Env path → `config/discovery.toml` → defaults.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from_file(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from_file(&fallback);
        }
        Ok(Self::default())
    }

    fn sanitize(&mut self) {
        let r = RankingConfig::default();
        if !nonneg(self.ranking.engagement_weight) {
            self.ranking.engagement_weight = r.engagement_weight;
        }
        if !nonneg(self.ranking.similarity_weight) {
            self.ranking.similarity_weight = r.similarity_weight;
        }
        if !nonneg(self.ranking.similarity_scale) {
            self.ranking.similarity_scale = r.similarity_scale;
        }

        if self.similarity.max_input_chars == 0 {
            self.similarity.max_input_chars = SimilarityConfig::default().max_input_chars;
        }
        if self.enrichment.batch_size == 0 {
            self.enrichment.batch_size = EnrichmentConfig::default().batch_size;
        }
        if self.connectors.timeout_secs == 0 {
            self.connectors.timeout_secs = ConnectorsConfig::default().timeout_secs;
        }

        let y = YoutubeEngagementConfig::default();
        let yc = &mut self.youtube_engagement;
        if ![yc.scale, yc.views, yc.likes, yc.comments].iter().all(|&w| nonneg(w)) {
            *yc = y;
        }
    }
}

fn nonneg(x: f64) -> bool {
    x.is_finite() && x >= 0.0
}
