//! Generation orchestrator.
//!
//! For one platform at a time: cache check → generate → validate → cache
//! write, in that order. The orchestrator holds no per-platform mutable state,
//! so the controller may run any number of platforms concurrently against one
//! instance.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{
    parse_artifact, ContentDna, ContentFingerprint, ContentGenerator, CrosspostError, DnaExtractor,
    GenerationError, GenerationRequest, PlatformArtifact, PlatformId, ValidationEngine,
    ValidationState,
};
use serde::{Deserialize, Serialize};
use store::{CacheKey, FingerprintStore};
use tracing::{debug, warn};

use crate::audit::{self, AuditOutcome};
use crate::{NodeError, PlatformRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Upper bound on a single generator or extractor call.
    pub generation_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            generation_timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Skip the cache lookup and always call the generator. The new artifact
    /// still replaces the cached one.
    pub bypass_cache: bool,
}

/// An artifact and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub artifact: PlatformArtifact,
    pub cache_hit: bool,
}

/// DNA for a source document and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnaOutcome {
    pub dna: ContentDna,
    pub fingerprint: ContentFingerprint,
    pub cache_hit: bool,
    /// `true` when extraction output was unusable and a minimal record was
    /// built from the source text instead.
    pub degraded: bool,
}

pub struct GenerationOrchestrator {
    registry: Arc<PlatformRegistry>,
    engine: Arc<ValidationEngine>,
    store: Arc<FingerprintStore>,
    generator: Arc<dyn ContentGenerator>,
    extractor: Arc<dyn DnaExtractor>,
    config: OrchestratorConfig,
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GenerationOrchestrator {
    pub fn new(
        registry: Arc<PlatformRegistry>,
        store: Arc<FingerprintStore>,
        generator: Arc<dyn ContentGenerator>,
        extractor: Arc<dyn DnaExtractor>,
        config: OrchestratorConfig,
    ) -> Self {
        let engine = Arc::new(registry.validation_engine());
        Self {
            registry,
            engine,
            store,
            generator,
            extractor,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<PlatformRegistry> {
        &self.registry
    }

    pub fn engine(&self) -> &Arc<ValidationEngine> {
        &self.engine
    }

    /// Cache key for `dna` rendered for `platform`.
    pub fn artifact_key(dna: &ContentDna, platform: &PlatformId) -> CacheKey {
        CacheKey::artifact(ContentFingerprint::of_dna(dna).for_platform(platform))
    }

    /// Produces the artifact for `platform`.
    ///
    /// A cache hit is returned with its validation marked
    /// [`ValidationState::Stale`]. On a miss the fresh artifact is validated and
    /// cached whether or not it passed, so a retry within the TTL window returns
    /// the same artifact unless `options.bypass_cache` is set.
    pub async fn generate_for_platform(
        &self,
        dna: &ContentDna,
        platform: &PlatformId,
        options: GenerateOptions,
    ) -> Result<GeneratedArtifact, NodeError> {
        let profile = self
            .registry
            .profile(platform)
            .ok_or_else(|| CrosspostError::UnknownPlatform {
                platform: platform.to_string(),
            })?;
        let key = Self::artifact_key(dna, platform);

        if !options.bypass_cache {
            if let Some(cached) = self.store.get::<PlatformArtifact>(&key) {
                audit::record(AuditOutcome::CacheHit, platform, key.fingerprint.as_str());
                let validation = cached.validation.clone().into_stale();
                return Ok(GeneratedArtifact {
                    artifact: cached.with_validation(validation),
                    cache_hit: true,
                });
            }
        }

        let request = GenerationRequest::for_profile(dna, profile);
        let artifact = match self.call_generator(platform, &request).await {
            Ok(artifact) => artifact,
            Err(err) => {
                audit::record(AuditOutcome::GenerationFailed, platform, &err.to_string());
                return Err(err.into());
            }
        };

        let result = self.engine.run(&artifact);
        let valid = result.is_valid();
        let artifact = artifact.with_validation(ValidationState::Fresh(result));

        // Invalid artifacts are cached too.
        if let Err(error) = self.store.put(&key, &artifact) {
            warn!(platform = %platform, %error, "Could not cache generated artifact");
        }

        if valid {
            audit::record(AuditOutcome::Generated, platform, key.fingerprint.as_str());
        } else {
            let errors = artifact
                .validation
                .result()
                .map(|r| r.errors.join("; "))
                .unwrap_or_default();
            audit::record(AuditOutcome::ValidationFailed, platform, &errors);
        }

        Ok(GeneratedArtifact {
            artifact,
            cache_hit: false,
        })
    }

    /// Returns the DNA for `source`, consulting the cache first.
    ///
    /// Unparseable extractor output degrades to
    /// [`ContentDna::minimal_from_source`] (not cached). Transient failures,
    /// timeouts and rejected credentials stop the run.
    pub async fn dna_for_content(&self, source: &str) -> Result<DnaOutcome, CrosspostError> {
        let fingerprint = FingerprintStore::fingerprint(source, None);
        let key = CacheKey::dna(fingerprint.clone());

        if let Some(dna) = self.store.get::<ContentDna>(&key) {
            debug!(fingerprint = %fingerprint, "DNA cache hit");
            return Ok(DnaOutcome {
                dna,
                fingerprint,
                cache_hit: true,
                degraded: false,
            });
        }

        let timeout = self.config.generation_timeout;
        let extracted = match tokio::time::timeout(timeout, self.extractor.extract(source)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout { after: timeout }),
        };

        match extracted {
            Ok(dna) => {
                if let Err(error) = self.store.put(&key, &dna) {
                    warn!(fingerprint = %fingerprint, %error, "Could not cache DNA");
                }
                Ok(DnaOutcome {
                    dna,
                    fingerprint,
                    cache_hit: false,
                    degraded: false,
                })
            }
            Err(GenerationError::InvalidResponse { message }) => {
                warn!(
                    fingerprint = %fingerprint,
                    reason = %message,
                    "DNA extraction unusable; falling back to minimal DNA"
                );
                Ok(DnaOutcome {
                    dna: ContentDna::minimal_from_source(source),
                    fingerprint,
                    cache_hit: false,
                    degraded: true,
                })
            }
            Err(source) => Err(CrosspostError::DnaExtractionFailed { source }),
        }
    }

    async fn call_generator(
        &self,
        platform: &PlatformId,
        request: &GenerationRequest,
    ) -> Result<PlatformArtifact, GenerationError> {
        let timeout = self.config.generation_timeout;
        let raw = tokio::time::timeout(timeout, self.generator.generate(platform, request))
            .await
            .map_err(|_| GenerationError::Timeout { after: timeout })??;
        parse_artifact(platform, &raw)
    }
}
