//! Platform fit selection.
//!
//! Decides, once per run, which platforms get a generated variant. Two paths
//! produce the same [`PlatformRecommendation`] list:
//!
//! - deterministic [`score`] against each [`PlatformProfile`]'s content-type lists;
//! - an external advisor, via [`build_selection_request`] and [`parse_selection`].
//!
//! Whenever the advisor is unavailable or its answer cannot be parsed, every
//! known platform degrades to [`FitTier::Moderate`] instead of failing the run.

use serde::{Deserialize, Serialize};

use crate::response::extract_json;
use crate::{ContentDna, PlatformId};

/// How well content fits a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitTier {
    Strong,
    Moderate,
    Skip,
}

impl FitTier {
    /// Parses an advisor's tier label. Anything unrecognised (including
    /// `"weak"`) is treated as [`FitTier::Skip`].
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "strong" => Self::Strong,
            "moderate" => Self::Moderate,
            _ => Self::Skip,
        }
    }

    /// `true` for tiers that should be generated.
    pub fn is_selected(self) -> bool {
        matches!(self, Self::Strong | Self::Moderate)
    }
}

/// The selector's verdict for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRecommendation {
    pub platform: PlatformId,
    pub fit: FitTier,
    pub reason: String,
}

/// Audience description and content-type preferences for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub id: PlatformId,
    pub audience: String,
    /// Content types that perform best.
    pub sweet_spot: Vec<String>,
    /// Content types that do not belong on this platform.
    pub avoid: Vec<String>,
    pub needs: String,
    pub red_flags: String,
}

/// Deterministically scores `dna` against `profile`.
///
/// Avoided content types are skipped, sweet-spot types are strong, anything
/// else is moderate. The avoid list wins when a type appears in both.
pub fn score(dna: &ContentDna, profile: &PlatformProfile) -> PlatformRecommendation {
    let content_type = &dna.content_type;
    let (fit, reason) = if profile.avoid.iter().any(|t| content_type.matches(t)) {
        (
            FitTier::Skip,
            format!(
                "{content_type} content is a poor fit for {} ({})",
                profile.id, profile.audience
            ),
        )
    } else if profile.sweet_spot.iter().any(|t| content_type.matches(t)) {
        (
            FitTier::Strong,
            format!("{content_type} is a sweet spot for {}", profile.id),
        )
    } else {
        (
            FitTier::Moderate,
            format!("{content_type} is acceptable on {}; needs {}", profile.id, profile.needs),
        )
    };
    PlatformRecommendation {
        platform: profile.id.clone(),
        fit,
        reason,
    }
}

/// Scores every profile in catalog order.
pub fn score_all<'a>(
    dna: &ContentDna,
    profiles: impl IntoIterator<Item = &'a PlatformProfile>,
) -> Vec<PlatformRecommendation> {
    profiles.into_iter().map(|p| score(dna, p)).collect()
}

/// Splits recommendations into `(generate, skip)`, preserving input order.
pub fn partition(
    recommendations: &[PlatformRecommendation],
) -> (Vec<PlatformRecommendation>, Vec<PlatformRecommendation>) {
    recommendations
        .iter()
        .cloned()
        .partition(|r| r.fit.is_selected())
}

/// Conservative default: every known platform at [`FitTier::Moderate`].
pub fn fallback_recommendations<'a>(
    profiles: impl IntoIterator<Item = &'a PlatformProfile>,
    reason: &str,
) -> Vec<PlatformRecommendation> {
    profiles
        .into_iter()
        .map(|p| PlatformRecommendation {
            platform: p.id.clone(),
            fit: FitTier::Moderate,
            reason: reason.to_string(),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// External advisor
// ---------------------------------------------------------------------------

/// Structured request handed to a [`crate::FitAdvisor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub dna: ContentDna,
    pub profiles: Vec<PlatformProfile>,
    /// Rendered instruction text for text-completion style advisors.
    pub prompt: String,
}

/// Builds the advisor request for `dna` across `profiles`.
pub fn build_selection_request(dna: &ContentDna, profiles: &[PlatformProfile]) -> SelectionRequest {
    let platform_lines = profiles
        .iter()
        .map(|p| {
            format!(
                "- {}: {}. Best for: {}. Needs: {}. Avoid if: {}",
                p.id,
                p.audience,
                p.sweet_spot.join(", "),
                p.needs,
                p.red_flags
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let list = |items: &[String], empty: &str| {
        if items.is_empty() {
            empty.to_string()
        } else {
            items.join(", ")
        }
    };

    let prompt = format!(
        "Decide which platforms fit this content.\n\n\
         CONTENT DNA\n\
         Type: {}\n\
         Value proposition: {}\n\
         Target audience: {}\n\
         Technical details: {}\n\
         Problem solved: {}\n\
         Unique aspects: {}\n\
         Limitations: {}\n\
         Key metrics: {}\n\n\
         PLATFORMS\n{}\n\n\
         For each platform answer \"strong\", \"moderate\" or \"skip\" with a one sentence reason.\n\
         Return only a JSON array: [{{\"platform\": \"...\", \"fit\": \"...\", \"reason\": \"...\"}}]",
        dna.content_type,
        dna.value_proposition,
        dna.target_audience,
        list(&dna.technical_details, "none specified"),
        dna.problem_solved,
        list(&dna.unique_aspects, "none specified"),
        list(&dna.limitations, "none mentioned"),
        list(&dna.key_metrics, "none"),
        platform_lines,
    );

    SelectionRequest {
        dna: dna.clone(),
        profiles: profiles.to_vec(),
        prompt,
    }
}

#[derive(Debug, Deserialize)]
struct RawRecommendation {
    #[serde(default)]
    platform: String,
    #[serde(default)]
    fit: String,
    #[serde(default)]
    reason: String,
}

/// Parses an advisor answer into one recommendation per known platform.
///
/// - Unparseable output: every profile degrades to [`FitTier::Moderate`].
/// - Platforms not in `profiles` are dropped.
/// - Profiles missing from the answer are reported as [`FitTier::Skip`].
pub fn parse_selection(response: &str, profiles: &[PlatformProfile]) -> Vec<PlatformRecommendation> {
    let parsed: Vec<RawRecommendation> = match serde_json::from_str(extract_json(response)) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(error = %err, "Unparseable platform selection, defaulting every platform to moderate");
            return fallback_recommendations(profiles, "Failed to parse selection, defaulting");
        }
    };

    profiles
        .iter()
        .map(|profile| {
            match parsed
                .iter()
                .find(|raw| raw.platform.trim().eq_ignore_ascii_case(profile.id.as_str()))
            {
                Some(raw) => PlatformRecommendation {
                    platform: profile.id.clone(),
                    fit: FitTier::from_label(&raw.fit),
                    reason: raw.reason.clone(),
                },
                None => PlatformRecommendation {
                    platform: profile.id.clone(),
                    fit: FitTier::Skip,
                    reason: "No recommendation returned".to_string(),
                },
            }
        })
        .collect()
}
