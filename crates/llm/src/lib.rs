//! Crosspost chat-completions adapter.
//!
//! Implements [`pipeline::ContentGenerator`], [`pipeline::DnaExtractor`] and
//! [`pipeline::FitAdvisor`] over any OpenAI-compatible `/chat/completions`
//! endpoint. Other providers are added as further clients in this crate
//! without changes to the `pipeline` crate.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request formatting, response decoding,
//! and the mapping of HTTP failures onto [`pipeline::GenerationError`] live
//! here. Timeouts and retry decisions belong to the caller.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`config`] | [`LlmConfig`]: endpoint, model, credentials, sampling |
//! | [`client`] | [`LlmClient`] and the port implementations |
//! | `http` | status-code classification, `Retry-After` parsing |
//! | `prompts` | instruction text for DNA extraction |

pub mod client;
pub mod config;

mod error;
mod http;
mod prompts;

pub use client::LlmClient;
pub use config::LlmConfig;
pub use error::LlmError;
