use thiserror::Error;

/// Errors raised while constructing an [`crate::LlmClient`].
///
/// Failures of individual calls are reported as
/// [`pipeline::GenerationError`] instead.
#[derive(Debug, Error)]
pub enum LlmError {
    /// No API key was supplied.
    #[error("API key is missing (expected in ${env})")]
    MissingApiKey {
        /// Environment variable the key is read from.
        env: String,
    },

    /// The base URL is not an http(s) URL.
    #[error("invalid base URL '{url}': must start with http:// or https://")]
    InvalidBaseUrl { url: String },

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}
