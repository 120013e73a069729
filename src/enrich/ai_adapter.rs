// src/enrich/ai_adapter.rs
//! Generative-AI adapter for topic briefings: provider abstraction, OpenAI
//! implementation, disabled + mock clients, and response validation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::topic::{Briefing, Platform, TrendingTopic};

// ------------------------------------------------------------
// Public surface
// ------------------------------------------------------------

pub const MIN_KEY_POINTS: usize = 3;
pub const MAX_KEY_POINTS: usize = 5;
pub const MIN_ANGLES: usize = 2;
pub const MAX_ANGLES: usize = 3;

/// Env switch: `DISCOVERY_AI_TEST_MODE=mock` swaps in a deterministic provider.
pub const ENV_AI_TEST_MODE: &str = "DISCOVERY_AI_TEST_MODE";

/// What the model sees about one topic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingRequest {
    pub title: String,
    pub context: String,
    pub platform: Platform,
    pub url: String,
    pub engagement_summary: String,
}

impl BriefingRequest {
    pub fn from_topic(topic: &TrendingTopic) -> Self {
        let engagement_summary = match topic.similarity {
            Some(sim) => format!(
                "engagement score {:.1} on {}, relevance {:.2}",
                topic.metrics.engagement_score,
                topic.platform(),
                sim
            ),
            None => format!(
                "engagement score {:.1} on {}",
                topic.metrics.engagement_score,
                topic.platform()
            ),
        };
        Self {
            title: topic.title.clone(),
            context: topic.context.clone(),
            platform: topic.platform(),
            url: topic.source.url.clone(),
            engagement_summary,
        }
    }
}

/// Raw structured answer from the model, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefingResponse {
    pub briefing: String,
    pub key_points: Vec<String>,
    pub angles: Vec<String>,
    #[serde(default)]
    pub target_audience: String,
}

impl BriefingResponse {
    /// Validate and clean. Lists longer than allowed are cut; shorter lists
    /// or an empty briefing are schema violations.
    pub fn into_briefing(self) -> Result<Briefing> {
        let briefing = sanitize_line(&self.briefing, 1200);
        if briefing.is_empty() {
            bail!("briefing text is empty");
        }
        let key_points = clean_list(self.key_points, MAX_KEY_POINTS);
        if key_points.len() < MIN_KEY_POINTS {
            bail!(
                "expected {MIN_KEY_POINTS}-{MAX_KEY_POINTS} key points, got {}",
                key_points.len()
            );
        }
        let angles = clean_list(self.angles, MAX_ANGLES);
        if angles.len() < MIN_ANGLES {
            bail!("expected {MIN_ANGLES}-{MAX_ANGLES} angles, got {}", angles.len());
        }
        let audience = sanitize_line(&self.target_audience, 200);
        Ok(Briefing {
            briefing,
            key_points,
            suggested_angles: angles,
            target_audience: (!audience.is_empty()).then_some(audience),
        })
    }
}

/// Trait object used by the enricher (and tests).
pub trait BriefingProvider: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: &'a BriefingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BriefingResponse>> + Send + 'a>>;
    /// False when no credentials exist; the enricher then makes no calls.
    fn is_configured(&self) -> bool;
    fn provider_name(&self) -> &'static str;
}

pub type DynBriefingProvider = Arc<dyn BriefingProvider>;

/// Factory:
/// * `DISCOVERY_AI_TEST_MODE=mock` → deterministic mock.
/// * no OpenAI key → disabled client.
/// * else the OpenAI provider.
pub fn build_briefing_provider(api_key: Option<String>, model: &str) -> DynBriefingProvider {
    if std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Arc::new(MockBriefingProvider::default());
    }
    match api_key {
        Some(key) => match OpenAiBriefingProvider::new(key, Some(model)) {
            Ok(p) => Arc::new(p),
            Err(e) => {
                tracing::warn!(error = %e, "could not build OpenAI client; briefings disabled");
                Arc::new(DisabledBriefingProvider)
            }
        },
        None => Arc::new(DisabledBriefingProvider),
    }
}

// ------------------------------------------------------------
// Concrete providers
// ------------------------------------------------------------

const SYSTEM_PROMPT: &str = "You are a content strategist for social media creators. \
Given a trending topic, reply with ONLY a JSON object with keys: \
\"briefing\" (2-3 sentence summary), \"keyPoints\" (3 to 5 short strings), \
\"angles\" (2 to 3 short content angles), \"targetAudience\" (one short phrase). \
No markdown, no extra keys.";

/// OpenAI Chat Completions in JSON mode. Requires an API key.
pub struct OpenAiBriefingProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBriefingProvider {
    /// `model_override` defaults to gpt-4o-mini.
    pub fn new(api_key: String, model_override: Option<&str>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("trend-discovery/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            api_key,
            model: model_override.unwrap_or("gpt-4o-mini").to_string(),
            base_url: crate::similarity::embeddings::OPENAI_API_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn generate_impl(&self, request: &BriefingRequest) -> Result<BriefingResponse> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ResponseFormat {
            #[serde(rename = "type")]
            kind: &'static str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            messages: Vec<Msg<'a>>,
            temperature: f32,
            max_tokens: u32,
            response_format: ResponseFormat,
        }
        #[derive(Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMsg,
        }
        #[derive(Deserialize)]
        struct ChoiceMsg {
            content: Option<String>,
        }

        let user = serde_json::to_string(request)?;
        let req = Req {
            model: &self.model,
            messages: vec![
                Msg {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Msg {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.4,
            max_tokens: 600,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("OpenAI briefing error ({status}): {body}");
        }
        let body: Resp = resp.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("no content in OpenAI response"))?;
        parse_briefing_json(&content)
    }
}

impl BriefingProvider for OpenAiBriefingProvider {
    fn generate<'a>(
        &'a self,
        request: &'a BriefingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BriefingResponse>> + Send + 'a>> {
        Box::pin(self.generate_impl(request))
    }
    fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Used when AI is off. Never called by the enricher because `is_configured` is false.
pub struct DisabledBriefingProvider;

impl BriefingProvider for DisabledBriefingProvider {
    fn generate<'a>(
        &'a self,
        _request: &'a BriefingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BriefingResponse>> + Send + 'a>> {
        Box::pin(async { Err(anyhow!("briefing provider disabled")) })
    }
    fn is_configured(&self) -> bool {
        false
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/// Deterministic provider for tests/local runs.
#[derive(Clone)]
pub struct MockBriefingProvider {
    pub fixed: BriefingResponse,
}

impl Default for MockBriefingProvider {
    fn default() -> Self {
        Self {
            fixed: BriefingResponse {
                briefing: "Mock briefing".to_string(),
                key_points: vec!["one".into(), "two".into(), "three".into()],
                angles: vec!["how-to".into(), "hot take".into()],
                target_audience: "creators".to_string(),
            },
        }
    }
}

impl BriefingProvider for MockBriefingProvider {
    fn generate<'a>(
        &'a self,
        _request: &'a BriefingRequest,
    ) -> Pin<Box<dyn Future<Output = Result<BriefingResponse>> + Send + 'a>> {
        let out = self.fixed.clone();
        Box::pin(async move { Ok(out) })
    }
    fn is_configured(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Parsing + sanitization
// ------------------------------------------------------------

/// Parse model output; tolerates a ```json fence around the object.
pub fn parse_briefing_json(content: &str) -> Result<BriefingResponse> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|s| s.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();
    serde_json::from_str(body).map_err(|e| anyhow!("malformed briefing JSON: {e}"))
}

/// Single line, collapsed whitespace, at most `max_chars` chars.
pub fn sanitize_line(input: &str, max_chars: usize) -> String {
    let mut out = String::with_capacity(input.len().min(max_chars));
    let mut prev_space = false;
    let mut count = 0usize;
    for ch in input.chars() {
        let c = if ch.is_whitespace() || ch.is_control() {
            ' '
        } else {
            ch
        };
        if c == ' ' {
            if !prev_space && !out.is_empty() {
                out.push(' ');
                count += 1;
            }
            prev_space = true;
        } else {
            out.push(c);
            count += 1;
            prev_space = false;
        }
        if count >= max_chars {
            break;
        }
    }
    out.trim().to_string()
}

fn clean_list(items: Vec<String>, max: usize) -> Vec<String> {
    items
        .iter()
        .map(|s| sanitize_line(s, 200))
        .filter(|s| !s.is_empty())
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(points: usize, angles: usize) -> BriefingResponse {
        BriefingResponse {
            briefing: "  A short\nbriefing. ".into(),
            key_points: (0..points).map(|i| format!("point {i}")).collect(),
            angles: (0..angles).map(|i| format!("angle {i}")).collect(),
            target_audience: "marketers".into(),
        }
    }

    #[test]
    fn valid_response_is_cleaned() {
        let b = resp(4, 2).into_briefing().unwrap();
        assert_eq!(b.briefing, "A short briefing.");
        assert_eq!(b.key_points.len(), 4);
        assert_eq!(b.suggested_angles.len(), 2);
        assert_eq!(b.target_audience.as_deref(), Some("marketers"));
    }

    #[test]
    fn long_lists_are_cut_short_lists_rejected() {
        let b = resp(9, 7).into_briefing().unwrap();
        assert_eq!(b.key_points.len(), MAX_KEY_POINTS);
        assert_eq!(b.suggested_angles.len(), MAX_ANGLES);

        assert!(resp(2, 2).into_briefing().is_err());
        assert!(resp(3, 1).into_briefing().is_err());
        let mut empty = resp(3, 2);
        empty.briefing = "   ".into();
        assert!(empty.into_briefing().is_err());
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let raw = r#"{"briefing":"b","keyPoints":["a","b","c"],"angles":["x","y"],"targetAudience":"t"}"#;
        let a = parse_briefing_json(raw).unwrap();
        let b = parse_briefing_json(&format!("```json\n{raw}\n```")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.key_points.len(), 3);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(parse_briefing_json("not json").is_err());
        assert!(parse_briefing_json(r#"{"briefing": 3}"#).is_err());
    }

    #[test]
    fn sanitize_line_collapses_and_caps() {
        assert_eq!(sanitize_line("a \n\t b", 100), "a b");
        assert_eq!(sanitize_line("abcdef", 3), "abc");
    }

    #[tokio::test]
    async fn disabled_provider_is_unconfigured_and_errors() {
        let p = DisabledBriefingProvider;
        assert!(!p.is_configured());
        let topic = TrendingTopic::new(
            Platform::Youtube,
            "1",
            "t",
            "",
            "",
            "",
            0.0,
            chrono::Utc::now(),
        );
        assert!(p.generate(&BriefingRequest::from_topic(&topic)).await.is_err());
    }
}
