//! Core domain for crosspost.
//!
//! This crate contains every domain concept, newtype identifier, validation
//! rule, selection heuristic, and capability port used by the pipeline. The
//! storage, orchestration, and LLM crates implement or consume what is defined
//! here; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`PlatformId`, `FailureId`, `PipelineRunId`, etc.) |
//! | [`types`] | Shared value types (`ContentDna`, `PlatformArtifact`, `FailedPost`, etc.) |
//! | [`errors`] | Error and retry-policy types |
//! | [`clock`] | Injectable time source |
//! | [`fingerprint`] | Content normalization and deterministic cache keys |
//! | [`validation`] | Declarative per-platform rules and the validation engine |
//! | [`selection`] | Platform fit scoring and advisor response parsing |
//! | [`subreddits`] | Ranking subreddits for a piece of content |
//! | [`timing`] | Posting windows and schedule notices |
//! | [`backoff`] | Retry delay schedule |
//! | [`ports`] | Generator, extractor, advisor, and deliverer contracts |
//! | [`response`] | Parsing raw generator output into domain values |

pub mod backoff;
pub mod clock;
pub mod errors;
pub mod fingerprint;
pub mod identifiers;
pub mod ports;
pub mod response;
pub mod selection;
pub mod subreddits;
pub mod timing;
pub mod types;
pub mod validation;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use backoff::BackoffSchedule;
pub use clock::{Clock, ManualClock, SystemClock};
pub use errors::{CrosspostError, DeliveryError, GenerationError, RetryPolicy};
pub use fingerprint::{ContentFingerprint, FINGERPRINT_HEX_LEN};
pub use identifiers::{ContentType, FailureId, PipelineRunId, PlatformId};
pub use ports::{ContentGenerator, Deliverer, DnaExtractor, FitAdvisor, GenerationRequest};
pub use response::{extract_json, parse_artifact, parse_dna};
pub use selection::{
    build_selection_request, fallback_recommendations, parse_selection, partition, score,
    score_all, FitTier, PlatformProfile, PlatformRecommendation, SelectionRequest,
};
pub use subreddits::{
    select_subreddits, CommunityTrait, ContentTypeTargets, SelfPromotion, Subreddit,
    SubredditCatalog, SubredditPick,
};
pub use timing::{
    check_schedule, describe_window, should_warn, suggest, NoticeLevel, ScheduleNotice,
    TimingProfile, TimingSuggestion, Weekday,
};
pub use types::{
    ContentDna, FailedPost, FailureState, PlatformArtifact, PublishReceipt, Timestamp,
    ValidationState, DEFAULT_MAX_RETRIES,
};
pub use validation::{
    Field, Finding, FnRule, ForbiddenTerms, LengthBound, RequiredElement, RequiredField, RuleSet,
    Severity, StructuralElement, ValidationEngine, ValidationResult, ValidationRule,
};
