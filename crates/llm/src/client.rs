//! Chat-completions client and the pipeline port implementations.

use std::time::Instant;

use async_trait::async_trait;
use pipeline::{
    parse_dna, ContentDna, ContentGenerator, DnaExtractor, FitAdvisor, GenerationError,
    GenerationRequest, PlatformId, SelectionRequest,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http::{check_response, transport_error};
use crate::{prompts, LlmConfig, LlmError};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first choice's text out of a chat-completions body.
fn completion_text(body: &str) -> Result<String, GenerationError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|err| GenerationError::invalid(format!("malformed completion body: {err}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| GenerationError::invalid("completion contained no text"))
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// One client serves all three text capabilities.
pub struct LlmClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        config.check()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Sends a single-message conversation and returns the reply text.
    pub async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, GenerationError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
        };

        let started = Instant::now();
        let response = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| transport_error(&err, self.config.request_timeout))?;

        let response = match check_response(response).await {
            Ok(response) => response,
            Err(error) => {
                warn!(model = %self.config.model, %error, "Completion request rejected");
                return Err(error);
            }
        };

        let body = response
            .text()
            .await
            .map_err(|err| transport_error(&err, self.config.request_timeout))?;
        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion received"
        );
        completion_text(&body)
    }
}

#[async_trait]
impl ContentGenerator for LlmClient {
    async fn generate(
        &self,
        platform: &PlatformId,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError> {
        debug!(platform = %platform, "Requesting platform rewrite");
        self.complete(&request.prompt, self.config.temperature).await
    }
}

#[async_trait]
impl DnaExtractor for LlmClient {
    async fn extract(&self, source: &str) -> Result<ContentDna, GenerationError> {
        let prompt = prompts::dna_extraction(source);
        let raw = self
            .complete(&prompt, self.config.extraction_temperature)
            .await?;
        parse_dna(&raw)
    }
}

#[async_trait]
impl FitAdvisor for LlmClient {
    async fn advise(&self, request: &SelectionRequest) -> Result<String, GenerationError> {
        self.complete(&request.prompt, self.config.extraction_temperature)
            .await
    }
}
