//! Per-platform audit events.
//!
//! Emitted on the [`AUDIT_TARGET`] tracing target with an `outcome` field so a
//! subscriber can route them separately from diagnostic logs.

use pipeline::PlatformId;
use tracing::{info, warn};

pub const AUDIT_TARGET: &str = "crosspost::audit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Generated,
    CacheHit,
    ValidationFailed,
    GenerationFailed,
    Published,
    DeliveryFailed,
    RetrySucceeded,
    RetryRescheduled,
    RetryExhausted,
    StoreFailed,
}

impl AuditOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generated => "generated",
            Self::CacheHit => "cache_hit",
            Self::ValidationFailed => "validation_failed",
            Self::GenerationFailed => "generation_failed",
            Self::Published => "published",
            Self::DeliveryFailed => "delivery_failed",
            Self::RetrySucceeded => "retry_succeeded",
            Self::RetryRescheduled => "retry_rescheduled",
            Self::RetryExhausted => "retry_exhausted",
            Self::StoreFailed => "store_failed",
        }
    }

    fn is_failure(self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::GenerationFailed
                | Self::DeliveryFailed
                | Self::RetryRescheduled
                | Self::RetryExhausted
                | Self::StoreFailed
        )
    }
}

pub(crate) fn record(outcome: AuditOutcome, platform: &PlatformId, detail: &str) {
    if outcome.is_failure() {
        warn!(
            target: AUDIT_TARGET,
            outcome = outcome.as_str(),
            platform = %platform,
            detail,
            "Platform outcome"
        );
    } else {
        info!(
            target: AUDIT_TARGET,
            outcome = outcome.as_str(),
            platform = %platform,
            detail,
            "Platform outcome"
        );
    }
}
