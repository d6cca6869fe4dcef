//! Top-level error and retry-policy types for the crosspost domain.
//!
//! [`CrosspostError`] covers conditions that halt the pipeline itself.
//! [`GenerationError`] and [`DeliveryError`] describe failures of the external
//! capabilities for a single platform; they never abort a whole run.
//!
//! [`RetryPolicy`] is a cross-cutting concern: any error type that participates
//! in retry decisions must be able to produce a [`RetryPolicy`].

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::PlatformId;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// The core never retries generation on its own; the policy is reported so the
/// caller can decide. Delivery failures are always retried through the failure
/// recovery manager's backoff schedule and carry no policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried as-is.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Pipeline-level errors
// ---------------------------------------------------------------------------

/// Errors that stop a pipeline run.
///
/// Component-local failures (a corrupted cache entry, one platform's generation
/// failure) are absorbed and logged instead; they never appear here.
#[derive(Debug, Error)]
pub enum CrosspostError {
    /// Platform selection produced an empty work-list.
    #[error("No platforms selected for generation")]
    NoPlatformsSelected,

    /// A platform was requested that the registry does not know.
    #[error("Unknown platform: {platform}")]
    UnknownPlatform {
        /// The requested identifier.
        platform: String,
    },

    /// The DNA extraction capability failed in a way that cannot be degraded.
    #[error("DNA extraction failed: {source}")]
    DnaExtractionFailed {
        /// The underlying capability failure.
        #[source]
        source: GenerationError,
    },

    /// The runtime configuration is invalid.
    ///
    /// Produced at load time; the pipeline never starts with an invalid config.
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Description of the configuration problem.
        message: String,
    },

    /// A platform's generation was refused in a way every other platform
    /// would share, such as rejected credentials.
    #[error("Generation for {platform} was rejected: {source}")]
    GenerationRejected {
        /// The platform whose call surfaced the rejection.
        platform: String,
        /// The underlying capability failure.
        #[source]
        source: GenerationError,
    },

    /// Persisted state could not be read or written.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage problem.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Capability errors
// ---------------------------------------------------------------------------

/// Failure of the content generation (or DNA extraction / fit advice) capability.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum GenerationError {
    /// Network error, rate limit, or upstream outage.
    #[error("Transient generation failure: {message}")]
    Transient {
        /// Description reported by the capability.
        message: String,
        /// Server-provided hint for when to try again.
        retry_after: Option<Duration>,
    },

    /// The capability answered, but the answer could not be used.
    #[error("Invalid generation response: {message}")]
    InvalidResponse {
        /// What was wrong with the response.
        message: String,
    },

    /// The capability refused the caller's credentials.
    #[error("Generation capability rejected the credentials: {message}")]
    Unauthorized {
        /// Description reported by the capability.
        message: String,
    },

    /// The call did not finish within the caller-supplied timeout.
    #[error("Generation timed out after {after:?}")]
    Timeout {
        /// The timeout that elapsed.
        after: Duration,
    },
}

impl GenerationError {
    /// Convenience constructor for [`GenerationError::Transient`] without a hint.
    pub fn transient(message: impl Into<String>) -> Self {
        Self::Transient {
            message: message.into(),
            retry_after: None,
        }
    }

    /// Convenience constructor for [`GenerationError::InvalidResponse`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Returns whether the caller may reasonably try again.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Transient { retry_after, .. } => RetryPolicy::Retryable {
                after: *retry_after,
            },
            Self::Timeout { .. } => RetryPolicy::Retryable { after: None },
            Self::InvalidResponse { .. } | Self::Unauthorized { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Failures that will repeat for every platform and every retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Failure to publish an artifact to its platform.
///
/// Every delivery error is routed into the failure recovery manager.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("Delivery to {platform} failed: {message}")]
pub struct DeliveryError {
    /// Platform the publish was aimed at.
    pub platform: PlatformId,
    /// Description reported by the deliverer.
    pub message: String,
}

impl DeliveryError {
    /// Creates a delivery error for `platform`.
    pub fn new(platform: PlatformId, message: impl Into<String>) -> Self {
        Self {
            platform,
            message: message.into(),
        }
    }

}
