use std::{env, time::Duration};

use anyhow::{Context, Result, anyhow};

use crate::transport::DEFAULT_TIMEOUT;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub image_endpoint: String,
    pub audio_endpoint: String,
    pub image_model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            image_endpoint: chat_completions_url(DEFAULT_API_BASE),
            audio_endpoint: transcriptions_url(DEFAULT_API_BASE),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reads `OPENAI_API_KEY` (required), `OPENAI_API_BASE` and
    /// `OPENAI_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("OPENAI_API_KEY not set in environment"))?;

        let mut config = Self::new(api_key);

        if let Some(base) = lookup("OPENAI_API_BASE").filter(|base| !base.is_empty()) {
            config = config.with_api_base(&base);
        }

        if let Some(secs) = lookup("OPENAI_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("invalid OPENAI_TIMEOUT_SECS: {}", secs))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_api_base(mut self, base: &str) -> Self {
        self.image_endpoint = chat_completions_url(base);
        self.audio_endpoint = transcriptions_url(base);
        self
    }
}

fn chat_completions_url(base: &str) -> String {
    format!("{}/chat/completions", base.trim_end_matches('/'))
}

fn transcriptions_url(base: &str) -> String {
    format!("{}/audio/transcriptions", base.trim_end_matches('/'))
}
