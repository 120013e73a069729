// src/connectors/mod.rs
//! Platform connectors: one thin HTTP client + one normalization function per
//! external source. Everything downstream only sees `TrendingTopic`.

pub mod instagram;
pub mod perplexity;
pub mod youtube;

pub use instagram::InstagramConnector;
pub use perplexity::PerplexityConnector;
pub use youtube::YoutubeConnector;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::discovery::TimeRange;
use crate::topic::{Platform, TrendingTopic};

/// Contract every source implements.
///
/// Missing credentials → `Ok(vec![])`. A real request or parse failure → `Err`.
/// The orchestrator tolerates both.
#[async_trait]
pub trait PlatformConnector: Send + Sync {
    async fn discover_by_keyword(
        &self,
        keyword: &str,
        time_range: TimeRange,
    ) -> Result<Vec<TrendingTopic>>;
    fn platform(&self) -> Platform;
    fn is_configured(&self) -> bool;
}

pub type DynConnector = Arc<dyn PlatformConnector>;

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("trend-discovery/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(5))
        .timeout(timeout)
        .build()?)
}

/// `log10(x + 1)`; 0 for non-positive or non-finite counts.
pub(crate) fn log_scale(x: f64) -> f64 {
    if x.is_finite() && x > 0.0 {
        (x + 1.0).log10()
    } else {
        0.0
    }
}
