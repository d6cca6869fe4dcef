//! Failure recovery manager.
//!
//! Persists failed deliveries as [`FailedPost`] records (one JSON file per
//! record, `{dir}/{failure_id}.json`) and answers "what is ready to retry?".
//!
//! ## State machine
//!
//! ```text
//! record_failure ──► AwaitingRetry ──(now ≥ next_retry)──► RetryReady
//!                         ▲                                    │
//!                         └──── record_retry_attempt ──────────┤
//!                               (attempt < max)                │
//!                                                              ▼
//!                  remove ◄── Exhausted (attempt == max, kept until removed)
//! ```
//!
//! Updates happen while the record's map slot is locked and are written to
//! disk before the in-memory copy changes, so a concurrent sweep can never
//! observe a half-applied update. Removal runs the other way round: memory
//! first, then the file.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use pipeline::{
    BackoffSchedule, Clock, FailedPost, FailureId, FailureState, PlatformArtifact, PlatformId,
    Timestamp, DEFAULT_MAX_RETRIES,
};
use tracing::{debug, info, warn};

use crate::files;
use crate::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    pub dir: PathBuf,
    /// Retry ceiling stamped on new records.
    pub max_retries: u32,
    pub backoff: BackoffSchedule,
}

impl RecoveryConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: BackoffSchedule::default(),
        }
    }
}

/// Result of [`FailureRecoveryManager::record_retry_attempt`].
#[derive(Debug, Clone, PartialEq)]
pub enum RetryAttemptOutcome {
    /// The attempt was counted and another retry is scheduled.
    Rescheduled(FailedPost),
    /// No retries remain. Returned both for the attempt that reaches the
    /// ceiling and, without mutation, for records that were already exhausted.
    Exhausted(FailedPost),
    NotFound,
}

/// Sole owner of [`FailedPost`] records.
pub struct FailureRecoveryManager {
    config: RecoveryConfig,
    records: DashMap<FailureId, FailedPost>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FailureRecoveryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureRecoveryManager")
            .field("config", &self.config)
            .field("records", &self.records.len())
            .finish()
    }
}

impl FailureRecoveryManager {
    /// Opens the manager and loads every persisted record.
    ///
    /// Unreadable record files are logged and deleted.
    pub fn open(config: RecoveryConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        if config.max_retries == 0 {
            return Err(StoreError::InvalidConfig {
                message: "max_retries must be at least 1".to_string(),
            });
        }
        files::ensure_dir(&config.dir)?;

        let records = DashMap::new();
        for path in files::record_files(&config.dir)? {
            let parsed = std::fs::read(&path)
                .map_err(|e| e.to_string())
                .and_then(|bytes| {
                    serde_json::from_slice::<FailedPost>(&bytes).map_err(|e| e.to_string())
                });
            match parsed {
                Ok(post) if files::file_stem(&path) == Some(post.id.as_str()) => {
                    records.insert(post.id.clone(), post);
                }
                _ => {
                    warn!(path = %path.display(), "Removing unreadable failure record");
                    files::remove_if_exists(&path)?;
                }
            }
        }
        debug!(loaded = records.len(), dir = %config.dir.display(), "Failure records loaded");

        Ok(Self {
            config,
            records,
            clock,
        })
    }

    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Delay before the retry following attempt `attempt_count`.
    pub fn backoff(&self, attempt_count: u32) -> Duration {
        self.config.backoff.delay(attempt_count)
    }

    /// Persists a new record for a failed delivery with `attempt_count = 1`.
    pub fn record_failure(
        &self,
        platform: &PlatformId,
        artifact: PlatformArtifact,
        error: impl Into<String>,
    ) -> Result<FailureId, StoreError> {
        let now = self.clock.now();
        let post = FailedPost {
            id: FailureId::generate(platform, now),
            platform: platform.clone(),
            artifact,
            error: error.into(),
            attempt_count: 1,
            created_at: now,
            last_attempt: now,
            next_retry: now.plus(self.backoff(1)),
            max_retries: self.config.max_retries,
        };

        let id = post.id.clone();
        files::write_json_atomic(&self.path_for(&id), &post)?;
        info!(
            failure_id = %id,
            platform = %platform,
            next_retry = %post.next_retry,
            "Delivery failure recorded"
        );
        self.records.insert(id.clone(), post);
        Ok(id)
    }

    /// Records whose retry time has been reached and that still have
    /// retries left, ordered by `next_retry`.
    pub fn list_retry_ready(&self, now: Timestamp) -> Vec<FailedPost> {
        let mut ready: Vec<FailedPost> = self
            .records
            .iter()
            .filter(|r| r.state_at(now) == FailureState::RetryReady)
            .map(|r| r.value().clone())
            .collect();
        ready.sort_by(|a, b| a.next_retry.cmp(&b.next_retry).then_with(|| a.id.cmp(&b.id)));
        ready
    }

    /// Counts a failed retry: increments the attempt counter, stamps
    /// `last_attempt`, optionally replaces the error, and reschedules.
    ///
    /// An already exhausted record is returned unchanged.
    pub fn record_retry_attempt(
        &self,
        id: &FailureId,
        error: Option<String>,
    ) -> Result<RetryAttemptOutcome, StoreError> {
        let Some(mut slot) = self.records.get_mut(id) else {
            return Ok(RetryAttemptOutcome::NotFound);
        };
        if slot.is_exhausted() {
            return Ok(RetryAttemptOutcome::Exhausted(slot.clone()));
        }

        let now = self.clock.now();
        let mut updated = slot.clone();
        updated.attempt_count += 1;
        updated.last_attempt = now;
        if let Some(error) = error {
            updated.error = error;
        }
        updated.next_retry = now.plus(self.backoff(updated.attempt_count));

        files::write_json_atomic(&self.path_for(id), &updated)?;
        *slot = updated.clone();

        if updated.is_exhausted() {
            warn!(
                failure_id = %id,
                attempt_count = updated.attempt_count,
                "Retries exhausted; record kept for inspection"
            );
            Ok(RetryAttemptOutcome::Exhausted(updated))
        } else {
            debug!(
                failure_id = %id,
                attempt_count = updated.attempt_count,
                next_retry = %updated.next_retry,
                "Retry rescheduled"
            );
            Ok(RetryAttemptOutcome::Rescheduled(updated))
        }
    }

    /// Deletes a record after a successful retry or an explicit abandonment.
    ///
    /// The in-memory record is dropped before the file is deleted, so a
    /// failed delete never leaves the record eligible for another retry in
    /// this process. The error is still returned; the stale file is picked up
    /// again on the next [`open`](Self::open).
    pub fn remove(&self, id: &FailureId) -> Result<bool, StoreError> {
        if self.records.remove(id).is_none() {
            return Ok(false);
        }
        files::remove_if_exists(&self.path_for(id))?;
        info!(failure_id = %id, "Failure record removed");
        Ok(true)
    }

    pub fn get(&self, id: &FailureId) -> Option<FailedPost> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Every record, oldest first, regardless of state.
    pub fn list_all(&self) -> Vec<FailedPost> {
        let mut all: Vec<FailedPost> = self.records.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        all
    }

    pub fn state_of(&self, id: &FailureId, now: Timestamp) -> Option<FailureState> {
        self.records.get(id).map(|r| r.state_at(now))
    }

    /// Raises a record's retry ceiling by `additional` attempts.
    ///
    /// This is the manual re-queue path for exhausted records; the attempt
    /// counter is never reset.
    pub fn extend_retries(
        &self,
        id: &FailureId,
        additional: u32,
    ) -> Result<Option<FailedPost>, StoreError> {
        let Some(mut slot) = self.records.get_mut(id) else {
            return Ok(None);
        };
        let mut updated = slot.clone();
        updated.max_retries = updated.max_retries.saturating_add(additional);

        files::write_json_atomic(&self.path_for(id), &updated)?;
        *slot = updated.clone();
        info!(failure_id = %id, max_retries = updated.max_retries, "Retry ceiling raised");
        Ok(Some(updated))
    }

    fn path_for(&self, id: &FailureId) -> PathBuf {
        self.config
            .dir
            .join(format!("{}.{}", id.as_str(), files::RECORD_EXTENSION))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::ManualClock;
    use pretty_assertions::assert_eq;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: PathBuf,
        clock: Arc<ManualClock>,
        manager: FailureRecoveryManager,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let clock = Arc::new(ManualClock::new(Timestamp::now()));
        let manager = FailureRecoveryManager::open(RecoveryConfig::new(&root), clock.clone()).unwrap();
        Fixture {
            _dir: dir,
            root,
            clock,
            manager,
        }
    }

    fn devto() -> PlatformId {
        PlatformId::new("devto").unwrap()
    }

    fn record(fx: &Fixture) -> FailureId {
        let artifact = PlatformArtifact::new(devto(), "Title", "Body");
        fx.manager
            .record_failure(&devto(), artifact, "connection reset")
            .unwrap()
    }

    #[test]
    fn new_record_starts_at_attempt_one() {
        let fx = fixture();
        let id = record(&fx);
        let post = fx.manager.get(&id).unwrap();

        assert_eq!(post.attempt_count, 1);
        assert_eq!(post.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(post.next_retry, fx.clock.now().plus(Duration::from_secs(60)));
        assert!(id.as_str().starts_with("devto_"));
    }

    #[test]
    fn record_is_ready_only_after_backoff() {
        let fx = fixture();
        let id = record(&fx);
        let now = fx.clock.now();

        assert!(fx.manager.list_retry_ready(now).is_empty());
        let later = now.plus(Duration::from_secs(61));
        let ready = fx.manager.list_retry_ready(later);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id, id);
    }

    #[test]
    fn retry_ready_boundary_is_inclusive() {
        let fx = fixture();
        let id = record(&fx);
        let now = fx.clock.now();
        assert_eq!(fx.manager.get(&id).unwrap().next_retry, now.plus(Duration::from_secs(60)));

        assert!(fx.manager.list_retry_ready(now.plus(Duration::from_secs(59))).is_empty());
        assert_eq!(fx.manager.list_retry_ready(now.plus(Duration::from_secs(60))).len(), 1);
    }

    #[test]
    fn retries_follow_the_backoff_table_until_exhausted() {
        let fx = fixture();
        let id = record(&fx);

        fx.clock.advance(Duration::from_secs(60));
        let post = match fx.manager.record_retry_attempt(&id, Some("timeout".into())).unwrap() {
            RetryAttemptOutcome::Rescheduled(post) => post,
            other => panic!("expected reschedule, got {other:?}"),
        };
        assert_eq!(post.attempt_count, 2);
        assert_eq!(post.error, "timeout");
        assert_eq!(post.next_retry, fx.clock.now().plus(Duration::from_secs(5 * 60)));

        fx.clock.advance(Duration::from_secs(5 * 60));
        let post = match fx.manager.record_retry_attempt(&id, None).unwrap() {
            RetryAttemptOutcome::Exhausted(post) => post,
            other => panic!("expected exhaustion, got {other:?}"),
        };
        assert_eq!(post.attempt_count, 3);
        assert_eq!(post.error, "timeout");
    }

    #[test]
    fn exhausted_record_is_kept_but_never_ready() {
        let fx = fixture();
        let id = record(&fx);
        for _ in 0..3 {
            fx.manager.record_retry_attempt(&id, None).unwrap();
        }

        let post = fx.manager.get(&id).unwrap();
        assert_eq!(post.attempt_count, 3);

        let far_future = fx.clock.now().plus(Duration::from_secs(24 * 60 * 60));
        assert!(fx.manager.list_retry_ready(far_future).is_empty());
        assert_eq!(fx.manager.state_of(&id, far_future), Some(FailureState::Exhausted));
        assert_eq!(fx.manager.list_all().len(), 1);
    }

    #[test]
    fn attempt_on_exhausted_record_does_not_mutate() {
        let fx = fixture();
        let id = record(&fx);
        fx.manager.record_retry_attempt(&id, None).unwrap();
        fx.manager.record_retry_attempt(&id, None).unwrap();
        let before = fx.manager.get(&id).unwrap();

        fx.clock.advance(Duration::from_secs(3600));
        let outcome = fx.manager.record_retry_attempt(&id, Some("ignored".into())).unwrap();
        assert_eq!(outcome, RetryAttemptOutcome::Exhausted(before.clone()));
        assert_eq!(fx.manager.get(&id).unwrap(), before);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let fx = fixture();
        let id = FailureId::new("devto_missing").unwrap();
        assert_eq!(
            fx.manager.record_retry_attempt(&id, None).unwrap(),
            RetryAttemptOutcome::NotFound
        );
        assert!(!fx.manager.remove(&id).unwrap());
        assert_eq!(fx.manager.extend_retries(&id, 1).unwrap(), None);
    }

    #[test]
    fn extend_retries_requeues_without_resetting_attempts() {
        let fx = fixture();
        let id = record(&fx);
        fx.manager.record_retry_attempt(&id, None).unwrap();
        fx.manager.record_retry_attempt(&id, None).unwrap();

        let post = fx.manager.extend_retries(&id, 2).unwrap().unwrap();
        assert_eq!((post.attempt_count, post.max_retries), (3, 5));

        let later = fx.clock.now().plus(Duration::from_secs(30 * 60));
        assert_eq!(fx.manager.state_of(&id, later), Some(FailureState::RetryReady));
    }

    #[test]
    fn records_survive_reopen() {
        let fx = fixture();
        let id = record(&fx);
        fx.manager.record_retry_attempt(&id, Some("503".into())).unwrap();

        let reopened =
            FailureRecoveryManager::open(RecoveryConfig::new(&fx.root), fx.clock.clone()).unwrap();
        let post = reopened.get(&id).unwrap();
        assert_eq!(post.attempt_count, 2);
        assert_eq!(post.error, "503");
    }

    #[test]
    fn persisted_record_uses_flat_field_names() {
        let fx = fixture();
        let id = record(&fx);
        let text = std::fs::read_to_string(fx.root.join(format!("{id}.json"))).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
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
    }

    #[test]
    fn remove_deletes_file_and_record() {
        let fx = fixture();
        let id = record(&fx);
        assert!(fx.manager.remove(&id).unwrap());
        assert!(fx.manager.get(&id).is_none());
        assert!(files::record_files(&fx.root).unwrap().is_empty());
    }

    #[test]
    fn remove_forgets_record_even_when_the_file_cannot_be_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("failed_posts");
        let clock = Arc::new(ManualClock::new(Timestamp::now()));
        let manager = FailureRecoveryManager::open(RecoveryConfig::new(&records), clock.clone()).unwrap();
        let id = manager
            .record_failure(&devto(), PlatformArtifact::new(devto(), "T", "B"), "503")
            .unwrap();

        std::fs::remove_dir_all(&records).unwrap();
        std::fs::write(&records, b"not a directory").unwrap();

        assert!(manager.remove(&id).is_err());
        assert!(manager.get(&id).is_none());
        let later = clock.now().plus(Duration::from_secs(3600));
        assert!(manager.list_retry_ready(later).is_empty());
        assert!(!manager.remove(&id).unwrap());
    }

    #[test]
    fn corrupt_record_files_are_dropped_on_open() {
        let fx = fixture();
        record(&fx);
        std::fs::write(fx.root.join("broken.json"), b"[").unwrap();

        let reopened =
            FailureRecoveryManager::open(RecoveryConfig::new(&fx.root), fx.clock.clone()).unwrap();
        assert_eq!(reopened.list_all().len(), 1);
        assert!(!fx.root.join("broken.json").exists());
    }

    #[test]
    fn zero_max_retries_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = RecoveryConfig::new(dir.path());
        config.max_retries = 0;
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(Timestamp::now()));
        assert!(matches!(
            FailureRecoveryManager::open(config, clock),
            Err(StoreError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn concurrent_attempts_never_skip_the_counter() {
        let fx = fixture();
        let id = record(&fx);
        fx.manager.extend_retries(&id, 100).unwrap();

        std::thread::scope(|scope| {
            for _ in 0..10 {
                let manager = &fx.manager;
                let id = &id;
                scope.spawn(move || {
                    manager.record_retry_attempt(id, None).unwrap();
                });
            }
        });
        assert_eq!(fx.manager.get(&id).unwrap().attempt_count, 11);
    }
}
