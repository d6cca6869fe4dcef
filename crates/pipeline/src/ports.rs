//! External capability contracts.
//!
//! The pipeline depends on four narrow capabilities implemented outside this
//! crate: text generation ([`ContentGenerator`]), DNA extraction
//! ([`DnaExtractor`]), platform fit advice ([`FitAdvisor`]), and publishing
//! ([`Deliverer`]). Callers wrap every invocation in their own timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    ContentDna, DeliveryError, GenerationError, PlatformArtifact, PlatformId, PlatformProfile,
    PublishReceipt, SelectionRequest,
};

/// Platform-specific request handed to a [`ContentGenerator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub platform: PlatformId,
    pub dna: ContentDna,
    /// Who the platform's readers are.
    pub audience: String,
    /// What content needs to succeed there.
    pub needs: String,
    /// What readers there reject.
    pub red_flags: String,
    /// Rendered instruction text for text-completion style generators.
    pub prompt: String,
}

impl GenerationRequest {
    /// Builds the request for `dna` on the platform described by `profile`.
    pub fn for_profile(dna: &ContentDna, profile: &PlatformProfile) -> Self {
        let prompt = format!(
            "Write a {platform} post for {audience}.\n\
             It needs: {needs}. Avoid: {red_flags}.\n\n\
             Value proposition: {value}\n\
             Problem solved: {problem}\n\
             Technical details: {details}\n\
             Unique aspects: {unique}\n\
             Limitations: {limits}\n\
             Content type: {content_type}\n\n\
             Return only JSON: {{\"title\": \"...\", \"body\": \"...\", \"tags\": [\"...\"]}}. \
             Any other keys you add are kept as metadata.",
            platform = profile.id,
            audience = profile.audience,
            needs = profile.needs,
            red_flags = profile.red_flags,
            value = dna.value_proposition,
            problem = dna.problem_solved,
            details = dna.technical_details.join(", "),
            unique = dna.unique_aspects.join(", "),
            limits = dna.limitations.join(", "),
            content_type = dna.content_type,
        );
        Self {
            platform: profile.id.clone(),
            dna: dna.clone(),
            audience: profile.audience.clone(),
            needs: profile.needs.clone(),
            red_flags: profile.red_flags.clone(),
            prompt,
        }
    }
}

/// Produces raw platform text from a structured request.
///
/// The returned text is expected to be a JSON object but may be anything; the
/// caller treats malformed output as [`GenerationError::InvalidResponse`].
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        platform: &PlatformId,
        request: &GenerationRequest,
    ) -> Result<String, GenerationError>;
}

/// Extracts [`ContentDna`] from source content.
#[async_trait]
pub trait DnaExtractor: Send + Sync {
    async fn extract(&self, source: &str) -> Result<ContentDna, GenerationError>;
}

/// Answers a platform selection request with raw text (a JSON array of
/// recommendations, possibly fenced).
#[async_trait]
pub trait FitAdvisor: Send + Sync {
    async fn advise(&self, request: &SelectionRequest) -> Result<String, GenerationError>;
}

/// Publishes an artifact to its platform.
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn publish(&self, artifact: &PlatformArtifact) -> Result<PublishReceipt, DeliveryError>;
}
