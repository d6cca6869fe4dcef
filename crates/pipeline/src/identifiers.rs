//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging, for example,
//! a [`PlatformId`] with a [`FailureId`] even though both are strings under the
//! hood.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// UUID-backed identifiers (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single pipeline execution run (one call to the controller).
///
/// Generated fresh for every run; propagated through spans and audit events
/// so all activity from a single run can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRunId(Uuid);

impl PipelineRunId {
    /// Generates a new random run identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PipelineRunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// String-backed identifiers
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a target platform (e.g. `"hackernews"`, `"devto"`).
    ///
    /// Platform identifiers are lowercase keys of the platform registry.
    PlatformId
}

string_id! {
    /// Identifies a persisted [`crate::FailedPost`] record.
    ///
    /// Rendered as `{platform}_{YYYYMMDD_HHMMSS}_{suffix}`; the suffix keeps two
    /// failures of the same platform within one second distinct.
    FailureId
}

string_id! {
    /// A content-type classification produced by DNA extraction
    /// (e.g. `"tool_launch"`, `"tutorial"`, `"case_study"`).
    ContentType
}

impl FailureId {
    /// Builds the identifier for a failure first recorded at `created_at`.
    pub fn generate(platform: &PlatformId, created_at: crate::Timestamp) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "{}_{}_{}",
            platform,
            created_at.as_datetime().format("%Y%m%d_%H%M%S"),
            &suffix[..8]
        ))
    }
}

impl ContentType {
    /// The catch-all classification used when extraction gives nothing better.
    pub fn general() -> Self {
        Self("general".to_string())
    }

    /// Case-insensitive comparison against a catalog content-type key.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}
