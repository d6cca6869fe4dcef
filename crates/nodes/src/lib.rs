//! crosspost orchestration.
//!
//! This crate sequences calls between the domain rules in [`pipeline`], the
//! persistence in [`store`], and the external capabilities (generator,
//! extractor, advisor, deliverers). It contains no domain rules of its own.
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`catalog`] | Built-in platform profiles, validation rule sets and posting windows |
//! | [`communities`] | Built-in subreddit catalog |
//! | [`registry`] | [`PlatformRegistry`]: platform id → profile, rules, deliverer |
//! | [`orchestrator`] | [`GenerationOrchestrator`]: cache → generate → validate → cache |
//! | [`controller`] | [`PipelineController`]: selection, parallel generation, delivery |
//! | [`sweep`] | [`RetrySweep`]: resubmits retry-ready failed deliveries |
//! | [`audit`] | Per-platform audit events |

pub mod audit;
pub mod catalog;
pub mod communities;
pub mod controller;
mod delivery;
mod error;
pub mod orchestrator;
pub mod registry;
pub mod sweep;

pub use audit::{AuditOutcome, AUDIT_TARGET};
pub use catalog::{PlatformDefinition, MARKETING_TERMS};
pub use communities::builtin_subreddits;
pub use controller::{
    ControllerConfig, GenerationReport, GenerationStatus, PipelineController, PlatformOutcome,
    PublishOutcome, PublishReport, PublishStatus, RunOptions, RunReport,
};
pub use error::NodeError;
pub use orchestrator::{
    DnaOutcome, GenerateOptions, GeneratedArtifact, GenerationOrchestrator, OrchestratorConfig,
};
pub use registry::PlatformRegistry;
pub use sweep::{RetrySweep, SweepReport, SweepStoreError};
