//! Shared value types for the crosspost domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (e.g. a validation result is valid exactly
//! when it has no errors, a failed post's attempt counter never decreases) and
//! participate in domain computations.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{ContentType, FailureId, PlatformId};

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly; the underlying representation can change without affecting the
/// domain API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }

    /// Returns this timestamp shifted forward by `delta`.
    ///
    /// Saturates at the latest representable instant instead of overflowing.
    #[must_use]
    pub fn plus(self, delta: Duration) -> Self {
        let shifted = TimeDelta::from_std(delta)
            .ok()
            .and_then(|d| self.0.checked_add_signed(d));
        Self(shifted.unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Returns `true` once `now` has reached or passed this timestamp.
    pub fn has_passed(self, now: Timestamp) -> bool {
        now >= self
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Content DNA
// ---------------------------------------------------------------------------

/// Structured attributes extracted from a piece of source content.
///
/// Produced by the external [`crate::DnaExtractor`] capability. The core treats
/// it as an opaque cacheable value; only `content_type` takes part in
/// deterministic platform scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDna {
    pub value_proposition: String,
    pub problem_solved: String,
    #[serde(default)]
    pub technical_details: Vec<String>,
    pub target_audience: String,
    #[serde(default)]
    pub key_metrics: Vec<String>,
    #[serde(default)]
    pub unique_aspects: Vec<String>,
    #[serde(default)]
    pub limitations: Vec<String>,
    pub content_type: ContentType,

    /// How new the idea is to the likely audience (free-form, e.g. `"high"`).
    #[serde(default)]
    pub novelty: Option<String>,
    /// How likely the content is to provoke debate (free-form).
    #[serde(default)]
    pub controversy_level: Option<String>,
    /// Whether the content carries demos, screenshots, or metrics.
    #[serde(default)]
    pub show_dont_tell: bool,
    /// Communities the extractor believes the content belongs in.
    #[serde(default)]
    pub best_fit_communities: Vec<String>,
}

impl ContentDna {
    /// Builds a minimal DNA record directly from the source text.
    ///
    /// Used when the extractor answers with something that cannot be parsed.
    /// The value proposition is the first 200 characters of the source.
    pub fn minimal_from_source(source: &str) -> Self {
        Self {
            value_proposition: source.chars().take(200).collect(),
            problem_solved: "Content analysis".to_string(),
            technical_details: Vec::new(),
            target_audience: "general".to_string(),
            key_metrics: Vec::new(),
            unique_aspects: Vec::new(),
            limitations: Vec::new(),
            content_type: ContentType::general(),
            novelty: None,
            controversy_level: None,
            show_dont_tell: false,
            best_fit_communities: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Platform artifacts
// ---------------------------------------------------------------------------

/// Validation status attached to a [`PlatformArtifact`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "result", rename_all = "snake_case")]
pub enum ValidationState {
    /// The artifact has not been run through the rule engine yet.
    Pending,
    /// Result produced by the current rule set in this run.
    Fresh(crate::ValidationResult),
    /// Result carried over from the cache; the rule set may have changed since.
    Stale(crate::ValidationResult),
}

impl ValidationState {
    /// Returns the attached result, fresh or stale.
    pub fn result(&self) -> Option<&crate::ValidationResult> {
        match self {
            Self::Pending => None,
            Self::Fresh(r) | Self::Stale(r) => Some(r),
        }
    }

    /// Returns `true` only for a fresh, valid result.
    pub fn is_fresh_and_valid(&self) -> bool {
        matches!(self, Self::Fresh(r) if r.is_valid())
    }

    /// Marks a fresh result as stale. Pending stays pending.
    #[must_use]
    pub fn into_stale(self) -> Self {
        match self {
            Self::Fresh(r) => Self::Stale(r),
            other => other,
        }
    }
}

/// A generated content variant for one platform.
///
/// The title, body, and metadata are never changed after generation; a failed
/// validation is reported through [`PlatformArtifact::validation`] and the
/// caller decides whether to regenerate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformArtifact {
    pub platform: PlatformId,
    pub title: String,
    pub body: String,
    /// Free-form platform extras (tags, description, thread parts, ...).
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub validation: ValidationState,
}

impl PlatformArtifact {
    /// Creates an artifact awaiting validation.
    pub fn new(platform: PlatformId, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            platform,
            title: title.into(),
            body: body.into(),
            metadata: serde_json::Map::new(),
            validation: ValidationState::Pending,
        }
    }

    /// Adds a metadata entry (builder style).
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Returns a copy carrying `validation`, leaving the content untouched.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationState) -> Self {
        self.validation = validation;
        self
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// Confirmation returned by a [`crate::Deliverer`] after a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Public location of the published post, when the platform reports one.
    pub url: Option<String>,
}

/// A delivery attempt that failed and is waiting to be retried.
///
/// Owned by the failure recovery manager; every other component receives
/// clones. `attempt_count` starts at 1 and only ever grows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPost {
    pub id: FailureId,
    pub platform: PlatformId,
    pub artifact: PlatformArtifact,
    pub error: String,
    pub attempt_count: u32,
    pub created_at: Timestamp,
    pub last_attempt: Timestamp,
    pub next_retry: Timestamp,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// Default retry ceiling for a new [`FailedPost`].
pub const DEFAULT_MAX_RETRIES: u32 = 3;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// Scheduler view of a [`FailedPost`] at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureState {
    /// Retries remain but the next retry time is still in the future.
    AwaitingRetry,
    /// Retries remain and the next retry time has been reached.
    RetryReady,
    /// `attempt_count` has reached `max_retries`; kept until removed.
    Exhausted,
}

impl FailedPost {
    /// Returns `true` when no scheduled retries remain.
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= self.max_retries
    }

    /// Classifies the record at `now`.
    pub fn state_at(&self, now: Timestamp) -> FailureState {
        if self.is_exhausted() {
            FailureState::Exhausted
        } else if self.next_retry.has_passed(now) {
            FailureState::RetryReady
        } else {
            FailureState::AwaitingRetry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_utc(Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap())
    }

    fn failed(attempt_count: u32, next_retry: Timestamp) -> FailedPost {
        let platform = PlatformId::new("devto").unwrap();
        FailedPost {
            id: FailureId::new("devto_x").unwrap(),
            artifact: PlatformArtifact::new(platform.clone(), "t", "b"),
            platform,
            error: "boom".into(),
            attempt_count,
            created_at: at(0),
            last_attempt: at(0),
            next_retry,
            max_retries: 3,
        }
    }

    #[test]
    fn plus_adds_std_durations() {
        assert_eq!(at(0).plus(Duration::from_secs(61)), at(61));
    }

    #[test]
    fn plus_saturates_instead_of_overflowing() {
        let far = at(0).plus(Duration::from_secs(u64::MAX));
        assert_eq!(far.as_datetime(), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn state_follows_attempts_and_schedule() {
        assert_eq!(failed(1, at(60)).state_at(at(59)), FailureState::AwaitingRetry);
        assert_eq!(failed(1, at(60)).state_at(at(60)), FailureState::RetryReady);
        assert_eq!(failed(3, at(60)).state_at(at(999)), FailureState::Exhausted);
    }

    #[test]
    fn stale_marking_keeps_the_result() {
        let result = crate::ValidationResult::default();
        let state = ValidationState::Fresh(result.clone()).into_stale();
        assert_eq!(state, ValidationState::Stale(result));
        assert_eq!(ValidationState::Pending.into_stale(), ValidationState::Pending);
    }

    #[test]
    fn minimal_dna_truncates_source() {
        let source = "x".repeat(500);
        let dna = ContentDna::minimal_from_source(&source);
        assert_eq!(dna.value_proposition.len(), 200);
        assert!(dna.content_type.matches("general"));
    }

    #[test]
    fn failed_post_round_trips_flat_fields() {
        let post = failed(2, at(300));
        let json = serde_json::to_value(&post).unwrap();
        for field in [
            "platform",
            "error",
            "attempt_count",
            "created_at",
            "last_attempt",
            "next_retry",
            "max_retries",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json["created_at"].is_string());
    }
}
