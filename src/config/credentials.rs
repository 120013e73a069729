// src/config/credentials.rs
//! API credentials, read once from the process environment.
//!
//! A missing or blank key means "capability off", never an error: the
//! connector or provider built from it degrades to an empty result.

use std::env;

pub const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
pub const ENV_APIFY_API_TOKEN: &str = "APIFY_API_TOKEN";
pub const ENV_PERPLEXITY_API_KEY: &str = "PERPLEXITY_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub youtube_api_key: Option<String>,
    pub apify_api_token: Option<String>,
    pub perplexity_api_key: Option<String>,
    pub openai_api_key: Option<String>,
}

// Keys never show up in logs; only whether they are set.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("youtube_api_key", &self.youtube_api_key.is_some())
            .field("apify_api_token", &self.apify_api_token.is_some())
            .field("perplexity_api_key", &self.perplexity_api_key.is_some())
            .field("openai_api_key", &self.openai_api_key.is_some())
            .finish()
    }
}

impl Credentials {
    pub fn from_env() -> Self {
        Self {
            youtube_api_key: read_key(ENV_YOUTUBE_API_KEY),
            apify_api_token: read_key(ENV_APIFY_API_TOKEN),
            perplexity_api_key: read_key(ENV_PERPLEXITY_API_KEY),
            openai_api_key: read_key(ENV_OPENAI_API_KEY),
        }
    }
}

fn read_key(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
