//! Persistence for crosspost.
//!
//! Everything the pipeline keeps across runs lives here:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`cache`] | [`FingerprintStore`]: two-tier TTL cache for DNA records and artifacts |
//! | [`recovery`] | [`FailureRecoveryManager`]: persisted failed deliveries and retry scheduling |
//! | [`archive`] | [`ResultsArchive`]: timestamped publish reports |
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Storage is plain JSON files written with temp-file +
//! rename, so every logical write is atomic to a concurrent reader. No
//! cross-record transactions are provided or needed.

pub mod archive;
pub mod cache;
mod error;
mod files;
pub mod recovery;

pub use archive::ResultsArchive;
pub use cache::{CacheEntry, CacheKey, CacheKind, CacheStats, FingerprintStore, StoreConfig};
pub use error::StoreError;
pub use recovery::{FailureRecoveryManager, RecoveryConfig, RetryAttemptOutcome};
