// src/similarity/embeddings.rs
//! Embedding provider abstraction + OpenAI implementation.
//!
//! `None` means "could not embed this text". Callers map it to the degraded
//! pass-through path, so providers swallow their own errors after logging them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed_query(&self, text: &str) -> Option<Vec<f32>>;
    /// One slot per input text, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>>;
    /// False when credentials are missing; the filter then skips all calls.
    fn is_configured(&self) -> bool;
    fn name(&self) -> &'static str;
}

pub type DynEmbeddings = Arc<dyn EmbeddingProvider>;

/// Always unavailable.
pub struct DisabledEmbeddings;

#[async_trait]
impl EmbeddingProvider for DisabledEmbeddings {
    async fn embed_query(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        vec![None; texts.len()]
    }
    fn is_configured(&self) -> bool {
        false
    }
    fn name(&self) -> &'static str {
        "disabled"
    }
}

/// OpenAI `/embeddings` client. Requires an API key.
pub struct OpenAiEmbeddings {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl OpenAiEmbeddings {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trend-discovery/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: model.into(),
            base_url: OPENAI_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn request(&self, input: serde_json::Value) -> anyhow::Result<Vec<EmbeddingData>> {
        let Some(key) = self.api_key.as_deref() else {
            anyhow::bail!("embedding provider not configured");
        };

        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            input: serde_json::Value,
        }

        let resp = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(key)
            .json(&Req {
                model: &self.model,
                input,
            })
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("OpenAI embedding error ({status}): {body}");
        }
        let body: EmbeddingResponse = resp.json().await?;
        Ok(body.data)
    }
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddings {
    async fn embed_query(&self, text: &str) -> Option<Vec<f32>> {
        if !self.is_configured() {
            return None;
        }
        match self.request(serde_json::Value::String(text.to_string())).await {
            Ok(data) => data
                .into_iter()
                .next()
                .map(|d| d.embedding)
                .filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, provider = "openai", "keyword embedding failed");
                None
            }
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        let mut out = vec![None; texts.len()];
        if !self.is_configured() || texts.is_empty() {
            return out;
        }
        let input = serde_json::Value::Array(
            texts
                .iter()
                .map(|t| serde_json::Value::String(t.clone()))
                .collect(),
        );
        match self.request(input).await {
            Ok(data) => {
                for (pos, d) in data.into_iter().enumerate() {
                    let slot = d.index.unwrap_or(pos);
                    if slot < out.len() && !d.embedding.is_empty() {
                        out[slot] = Some(d.embedding);
                    }
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    provider = "openai",
                    texts = texts.len(),
                    "batch embedding failed"
                );
            }
        }
        out
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
