// tests/common/mod.rs
// Test doubles for the collaborator traits.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trend_discovery::{
    BriefingProvider, BriefingRequest, BriefingResponse, EmbeddingProvider, Platform,
    PlatformConnector, TimeRange, TrendingTopic,
};

pub fn topic(platform: Platform, title: &str, engagement: f64) -> TrendingTopic {
    TrendingTopic::new(
        platform,
        title,
        title,
        "theme",
        "",
        format!("https://example.test/{title}"),
        engagement,
        Utc::now(),
    )
}

/// Returns a fixed list.
pub struct StaticConnector {
    pub platform: Platform,
    pub topics: Vec<TrendingTopic>,
    pub calls: AtomicUsize,
}

impl StaticConnector {
    pub fn new(platform: Platform, topics: Vec<TrendingTopic>) -> Arc<Self> {
        Arc::new(Self {
            platform,
            topics,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl PlatformConnector for StaticConnector {
    async fn discover_by_keyword(&self, _k: &str, _r: TimeRange) -> Result<Vec<TrendingTopic>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.topics.clone())
    }
    fn platform(&self) -> Platform {
        self.platform
    }
    fn is_configured(&self) -> bool {
        true
    }
}

/// Always errors.
pub struct FailingConnector(pub Platform);

#[async_trait]
impl PlatformConnector for FailingConnector {
    async fn discover_by_keyword(&self, _k: &str, _r: TimeRange) -> Result<Vec<TrendingTopic>> {
        Err(anyhow!("upstream 503"))
    }
    fn platform(&self) -> Platform {
        self.0
    }
    fn is_configured(&self) -> bool {
        true
    }
}

/// Sleeps before answering.
pub struct SlowConnector {
    pub platform: Platform,
    pub delay: Duration,
    pub topics: Vec<TrendingTopic>,
}

#[async_trait]
impl PlatformConnector for SlowConnector {
    async fn discover_by_keyword(&self, _k: &str, _r: TimeRange) -> Result<Vec<TrendingTopic>> {
        tokio::time::sleep(self.delay).await;
        Ok(self.topics.clone())
    }
    fn platform(&self) -> Platform {
        self.platform
    }
    fn is_configured(&self) -> bool {
        true
    }
}

/// Unconfigured: empty list, no error.
pub struct UnconfiguredConnector(pub Platform);

#[async_trait]
impl PlatformConnector for UnconfiguredConnector {
    async fn discover_by_keyword(&self, _k: &str, _r: TimeRange) -> Result<Vec<TrendingTopic>> {
        Ok(Vec::new())
    }
    fn platform(&self) -> Platform {
        self.0
    }
    fn is_configured(&self) -> bool {
        false
    }
}

/// Keyword → `[1, 0]`. Topic text containing "relevant" → `[1, 0]`,
/// "broken" → no vector, "wide" → 3-dim vector, anything else → `[0, 1]`.
pub struct KeywordEmbeddings {
    pub keyword_ok: bool,
}

impl KeywordEmbeddings {
    fn vec_for(text: &str) -> Option<Vec<f32>> {
        if text.contains("broken") {
            None
        } else if text.contains("wide") {
            Some(vec![1.0, 0.0, 0.0])
        } else if text.contains("relevant") {
            Some(vec![1.0, 0.0])
        } else {
            Some(vec![0.0, 1.0])
        }
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbeddings {
    async fn embed_query(&self, _text: &str) -> Option<Vec<f32>> {
        self.keyword_ok.then(|| vec![1.0, 0.0])
    }
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        texts.iter().map(|t| Self::vec_for(t)).collect()
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn name(&self) -> &'static str {
        "keyword-stub"
    }
}

pub fn good_response(tag: &str) -> BriefingResponse {
    BriefingResponse {
        briefing: format!("briefing for {tag}"),
        key_points: vec!["a".into(), "b".into(), "c".into()],
        angles: vec!["x".into(), "y".into()],
        target_audience: "founders".into(),
    }
}

/// Fails for titles containing "fail", returns a schema violation for
/// "malformed", succeeds otherwise. Tracks calls and peak concurrency.
#[derive(Default)]
pub struct ScriptedBriefings {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub latency: Duration,
    pub configured: bool,
}

impl ScriptedBriefings {
    pub fn configured(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            configured: true,
            ..Default::default()
        })
    }

    pub fn unconfigured() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

impl BriefingProvider for ScriptedBriefings {
    fn generate<'a>(
        &'a self,
        request: &'a BriefingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BriefingResponse>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if request.title.contains("fail") {
                Err(anyhow!("provider exploded"))
            } else if request.title.contains("malformed") {
                Ok(BriefingResponse {
                    briefing: "only two points".into(),
                    key_points: vec!["a".into(), "b".into()],
                    angles: vec!["x".into(), "y".into()],
                    target_audience: String::new(),
                })
            } else {
                Ok(good_response(&request.title))
            }
        })
    }
    fn is_configured(&self) -> bool {
        self.configured
    }
    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
