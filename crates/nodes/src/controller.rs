//! Pipeline controller.
//!
//! Owns one pipeline run end to end:
//!
//! 1. DNA for the source (cached, see [`GenerationOrchestrator::dna_for_content`]).
//! 2. Platform fit selection (external advisor when configured, otherwise the
//!    deterministic profile scorer; advisor failures degrade to "all moderate").
//! 3. Bounded-parallel generation, one task per selected platform.
//! 4. Delivery of valid artifacts; every delivery failure is recorded with the
//!    [`FailureRecoveryManager`].
//!
//! One platform's failure never aborts the run. Only pipeline-level problems
//! (no platforms selected, unknown platform requested, DNA extraction down,
//! credentials rejected) are returned as errors.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    build_selection_request, fallback_recommendations, parse_selection, partition, score_all,
    Clock, ContentDna, CrosspostError, FailureId, FitAdvisor, FitTier, PipelineRunId,
    PlatformArtifact, PlatformId, PlatformRecommendation, RetryPolicy, Timestamp,
    ValidationEngine, ValidationState,
};
use serde::{Deserialize, Serialize};
use store::{FailureRecoveryManager, ResultsArchive};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::audit::{self, AuditOutcome};
use crate::delivery::publish_with_timeout;
use crate::{GenerateOptions, GenerationOrchestrator, PlatformRegistry};

// ---------------------------------------------------------------------------
// Configuration and options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// Maximum platforms generated or delivered at the same time.
    pub max_concurrency: usize,
    pub advisor_timeout: Duration,
    pub delivery_timeout: Duration,
    /// Deliver artifacts even when validation reported errors.
    pub publish_invalid: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 4,
            advisor_timeout: Duration::from_secs(120),
            delivery_timeout: Duration::from_secs(30),
            publish_invalid: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Generate exactly these platforms, bypassing fit selection. Empty means
    /// the selector decides.
    pub platforms: Vec<PlatformId>,
    pub generate: GenerateOptions,
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationStatus {
    Generated {
        artifact: PlatformArtifact,
        cache_hit: bool,
    },
    Failed {
        error: String,
        /// Whether running the platform again may succeed.
        retryable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformOutcome {
    pub platform: PlatformId,
    #[serde(flatten)]
    pub status: GenerationStatus,
}

/// Everything the generation phase of a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub run_id: PipelineRunId,
    pub dna: ContentDna,
    pub dna_cache_hit: bool,
    /// The DNA is a minimal fallback built from the source text.
    pub dna_degraded: bool,
    pub recommendations: Vec<PlatformRecommendation>,
    /// One entry per selected platform, in recommendation order.
    pub outcomes: Vec<PlatformOutcome>,
}

impl GenerationReport {
    /// Recommendations with tier [`FitTier::Skip`].
    pub fn skipped(&self) -> impl Iterator<Item = &PlatformRecommendation> {
        self.recommendations
            .iter()
            .filter(|r| r.fit == FitTier::Skip)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &PlatformArtifact> {
        self.outcomes.iter().filter_map(|o| match &o.status {
            GenerationStatus::Generated { artifact, .. } => Some(artifact),
            GenerationStatus::Failed { .. } => None,
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &PlatformOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, GenerationStatus::Failed { .. }))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PublishStatus {
    Published {
        url: Option<String>,
    },
    /// Validation errors blocked delivery.
    SkippedInvalid {
        errors: Vec<String>,
    },
    /// No deliverer is registered for the platform.
    NoDeliverer,
    /// Delivery failed; `failure_id` identifies the recovery record when one
    /// could be written.
    Failed {
        error: String,
        failure_id: Option<FailureId>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishOutcome {
    pub platform: PlatformId,
    #[serde(flatten)]
    pub status: PublishStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishReport {
    pub run_id: PipelineRunId,
    pub published_at: Timestamp,
    pub outcomes: Vec<PublishOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub generation: GenerationReport,
    pub publish: PublishReport,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct PipelineController {
    registry: Arc<PlatformRegistry>,
    orchestrator: Arc<GenerationOrchestrator>,
    recovery: Arc<FailureRecoveryManager>,
    advisor: Option<Arc<dyn FitAdvisor>>,
    archive: Option<ResultsArchive>,
    clock: Arc<dyn Clock>,
    config: ControllerConfig,
}

impl std::fmt::Debug for PipelineController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineController")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .field("advisor", &self.advisor.is_some())
            .finish_non_exhaustive()
    }
}

impl PipelineController {
    pub fn new(
        orchestrator: Arc<GenerationOrchestrator>,
        recovery: Arc<FailureRecoveryManager>,
        clock: Arc<dyn Clock>,
        config: ControllerConfig,
    ) -> Self {
        Self {
            registry: Arc::clone(orchestrator.registry()),
            orchestrator,
            recovery,
            advisor: None,
            archive: None,
            clock,
            config,
        }
    }

    /// Delegates fit selection to an external advisor.
    #[must_use]
    pub fn with_advisor(mut self, advisor: Arc<dyn FitAdvisor>) -> Self {
        self.advisor = Some(advisor);
        self
    }

    /// Archives every publish report.
    #[must_use]
    pub fn with_archive(mut self, archive: ResultsArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    /// Decides which platforms suit `dna`.
    ///
    /// Never fails: an unavailable advisor or unparseable answer yields every
    /// known platform at [`FitTier::Moderate`].
    pub async fn recommend(&self, dna: &ContentDna) -> Vec<PlatformRecommendation> {
        let profiles = self.registry.profiles();
        let Some(advisor) = &self.advisor else {
            return score_all(dna, &profiles);
        };

        let request = build_selection_request(dna, &profiles);
        let timeout = self.config.advisor_timeout;
        match tokio::time::timeout(timeout, advisor.advise(&request)).await {
            Ok(Ok(response)) => parse_selection(&response, &profiles),
            Ok(Err(error)) => {
                warn!(%error, "Platform advisor failed; defaulting every platform to moderate");
                fallback_recommendations(&profiles, "Platform advisor unavailable, defaulting")
            }
            Err(_) => {
                warn!(?timeout, "Platform advisor timed out; defaulting every platform to moderate");
                fallback_recommendations(&profiles, "Platform advisor timed out, defaulting")
            }
        }
    }

    /// Runs DNA extraction, selection, and generation for `source`.
    pub async fn generate(
        &self,
        source: &str,
        options: &RunOptions,
    ) -> Result<GenerationReport, CrosspostError> {
        let run_id = PipelineRunId::new_random();
        let span = info_span!("pipeline_run", run_id = %run_id);
        self.generate_in_run(run_id, source, options)
            .instrument(span)
            .await
    }

    /// Delivers the artifacts of `report`.
    ///
    /// Stale or pending validation is redone against the current rules first.
    pub async fn publish(&self, report: &GenerationReport) -> PublishReport {
        let span = info_span!("pipeline_publish", run_id = %report.run_id);
        self.publish_in_run(report).instrument(span).await
    }

    /// Generates and then publishes.
    pub async fn run(&self, source: &str, options: &RunOptions) -> Result<RunReport, CrosspostError> {
        let generation = self.generate(source, options).await?;
        let publish = self.publish(&generation).await;
        Ok(RunReport {
            generation,
            publish,
        })
    }

    // -- generation --------------------------------------------------------

    async fn generate_in_run(
        &self,
        run_id: PipelineRunId,
        source: &str,
        options: &RunOptions,
    ) -> Result<GenerationReport, CrosspostError> {
        for platform in &options.platforms {
            if !self.registry.contains(platform) {
                return Err(CrosspostError::UnknownPlatform {
                    platform: platform.to_string(),
                });
            }
        }

        let dna = self.orchestrator.dna_for_content(source).await?;

        let recommendations = if options.platforms.is_empty() {
            self.recommend(&dna.dna).await
        } else {
            options
                .platforms
                .iter()
                .map(|platform| PlatformRecommendation {
                    platform: platform.clone(),
                    fit: FitTier::Strong,
                    reason: "Requested explicitly".to_string(),
                })
                .collect()
        };

        let (selected, skipped) = partition(&recommendations);
        for skip in &skipped {
            info!(platform = %skip.platform, reason = %skip.reason, "Platform skipped");
        }
        if selected.is_empty() {
            return Err(CrosspostError::NoPlatformsSelected);
        }

        let platforms: Vec<PlatformId> = selected.into_iter().map(|r| r.platform).collect();
        info!(platforms = platforms.len(), "Generating platform variants");
        let outcomes = self
            .generate_all(&dna.dna, &platforms, options.generate)
            .await?;

        Ok(GenerationReport {
            run_id,
            dna: dna.dna,
            dna_cache_hit: dna.cache_hit,
            dna_degraded: dna.degraded,
            recommendations,
            outcomes,
        })
    }

    async fn generate_all(
        &self,
        dna: &ContentDna,
        platforms: &[PlatformId],
        options: GenerateOptions,
    ) -> Result<Vec<PlatformOutcome>, CrosspostError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, platform) in platforms.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let orchestrator = Arc::clone(&self.orchestrator);
            let dna = dna.clone();
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await;
                    let result = orchestrator
                        .generate_for_platform(&dna, &platform, options)
                        .await;
                    (index, result)
                }
                .instrument(Span::current()),
            );
        }

        let mut slots: Vec<Option<GenerationStatus>> = vec![None; platforms.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(generated))) => {
                    slots[index] = Some(GenerationStatus::Generated {
                        artifact: generated.artifact,
                        cache_hit: generated.cache_hit,
                    });
                }
                Ok((index, Err(err))) if err.is_fatal() => {
                    error!(platform = %platforms[index], %err, "Generation rejected; stopping run");
                    tasks.abort_all();
                    return Err(err.into_run_error(&platforms[index]));
                }
                Ok((index, Err(err))) => {
                    slots[index] = Some(GenerationStatus::Failed {
                        retryable: matches!(err.retry_policy(), RetryPolicy::Retryable { .. }),
                        error: err.to_string(),
                    });
                }
                Err(join_error) => error!(%join_error, "Generation task aborted"),
            }
        }

        Ok(slots
            .into_iter()
            .zip(platforms)
            .map(|(slot, platform)| PlatformOutcome {
                platform: platform.clone(),
                status: slot.unwrap_or_else(|| GenerationStatus::Failed {
                    error: "generation task aborted".to_string(),
                    retryable: true,
                }),
            })
            .collect())
    }

    // -- delivery ----------------------------------------------------------

    async fn publish_in_run(&self, report: &GenerationReport) -> PublishReport {
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let artifacts: Vec<PlatformArtifact> = report.artifacts().cloned().collect();
        let mut tasks = JoinSet::new();

        for (index, artifact) in artifacts.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let engine = Arc::clone(self.orchestrator.engine());
            let registry = Arc::clone(&self.registry);
            let recovery = Arc::clone(&self.recovery);
            let config = self.config.clone();
            tasks.spawn(
                async move {
                    let _permit = semaphore.acquire_owned().await;
                    let outcome = deliver_one(&engine, &registry, &recovery, &config, artifact).await;
                    (index, outcome)
                }
                .instrument(Span::current()),
            );
        }

        let mut slots: Vec<Option<PublishOutcome>> = vec![None; artifacts.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(join_error) => error!(%join_error, "Delivery task aborted"),
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(&artifacts)
            .map(|(slot, artifact)| {
                slot.unwrap_or_else(|| PublishOutcome {
                    platform: artifact.platform.clone(),
                    status: PublishStatus::Failed {
                        error: "delivery task aborted".to_string(),
                        failure_id: None,
                    },
                })
            })
            .collect();

        let publish = PublishReport {
            run_id: report.run_id,
            published_at: self.clock.now(),
            outcomes,
        };

        if let Some(archive) = &self.archive {
            if let Err(error) = archive.save(&publish, publish.published_at) {
                warn!(%error, "Could not archive publish results");
            }
        }
        publish
    }
}

/// Re-validates stale or pending artifacts against the current rules.
fn revalidate(engine: &ValidationEngine, artifact: PlatformArtifact) -> PlatformArtifact {
    match artifact.validation {
        ValidationState::Fresh(_) => artifact,
        ValidationState::Stale(_) | ValidationState::Pending => {
            let result = engine.run(&artifact);
            artifact.with_validation(ValidationState::Fresh(result))
        }
    }
}

async fn deliver_one(
    engine: &ValidationEngine,
    registry: &PlatformRegistry,
    recovery: &FailureRecoveryManager,
    config: &ControllerConfig,
    artifact: PlatformArtifact,
) -> PublishOutcome {
    let platform = artifact.platform.clone();
    let artifact = revalidate(engine, artifact);

    let errors = artifact
        .validation
        .result()
        .map(|r| r.errors.clone())
        .unwrap_or_default();
    if !errors.is_empty() && !config.publish_invalid {
        info!(platform = %platform, errors = errors.len(), "Invalid artifact not delivered");
        return PublishOutcome {
            platform,
            status: PublishStatus::SkippedInvalid { errors },
        };
    }

    let Some(deliverer) = registry.deliverer(&platform) else {
        return PublishOutcome {
            platform,
            status: PublishStatus::NoDeliverer,
        };
    };

    match publish_with_timeout(deliverer.as_ref(), &artifact, config.delivery_timeout).await {
        Ok(receipt) => {
            audit::record(
                AuditOutcome::Published,
                &platform,
                receipt.url.as_deref().unwrap_or_default(),
            );
            PublishOutcome {
                platform,
                status: PublishStatus::Published { url: receipt.url },
            }
        }
        Err(delivery_error) => {
            let message = delivery_error.message.clone();
            audit::record(AuditOutcome::DeliveryFailed, &platform, &message);
            let failure_id = match recovery.record_failure(&platform, artifact, message.clone()) {
                Ok(id) => Some(id),
                Err(error) => {
                    error!(platform = %platform, %error, "Could not record delivery failure");
                    None
                }
            };
            PublishOutcome {
                platform,
                status: PublishStatus::Failed {
                    error: message,
                    failure_id,
                },
            }
        }
    }
}
