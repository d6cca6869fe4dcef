//! Client configuration.

use std::time::Duration;

use crate::LlmError;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Clone, PartialEq)]
pub struct LlmConfig {
    /// Root of the OpenAI-compatible API, without the `/chat/completions` suffix.
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    /// Per-request HTTP timeout. Callers usually apply their own, shorter or
    /// equal, timeout around each call as well.
    pub request_timeout: Duration,
    /// Sampling temperature for platform rewrites and fit advice.
    pub temperature: f32,
    /// Sampling temperature for DNA extraction, kept low for stable output.
    pub extraction_temperature: f32,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("request_timeout", &self.request_timeout)
            .field("temperature", &self.temperature)
            .field("extraction_temperature", &self.extraction_temperature)
            .finish()
    }
}

impl LlmConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            request_timeout: Duration::from_secs(120),
            temperature: 0.7,
            extraction_temperature: 0.2,
        }
    }

    /// Reads the API key from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self, LlmError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim())),
            _ => Err(LlmError::MissingApiKey {
                env: var.to_string(),
            }),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Full URL of the chat-completions endpoint.
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn check(&self) -> Result<(), LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey {
                env: DEFAULT_API_KEY_ENV.to_string(),
            });
        }
        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(LlmError::InvalidBaseUrl {
                url: self.base_url.clone(),
            });
        }
        Ok(())
    }
}
