//! Retry sweep for failed deliveries.
//!
//! Lists retry-ready records, republishes each through its platform's
//! deliverer, removes the record on success, and counts a failed attempt
//! otherwise. Records are processed one at a time; a record that disappears
//! or is exhausted between listing and processing is skipped, not corrupted.
//! A storage error is reported against its record and the sweep moves on.

use std::sync::Arc;
use std::time::Duration;

use pipeline::{FailureId, PlatformId, Timestamp};
use serde::{Deserialize, Serialize};
use store::{FailureRecoveryManager, RetryAttemptOutcome, StoreError};
use tracing::{info, info_span, warn, Instrument};

use crate::audit::{self, AuditOutcome};
use crate::delivery::publish_with_timeout;
use crate::PlatformRegistry;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Records that were ready when the sweep started.
    pub attempted: usize,
    pub succeeded: Vec<FailureId>,
    pub rescheduled: Vec<FailureId>,
    pub exhausted: Vec<FailureId>,
    /// No deliverer registered, or the record vanished mid-sweep.
    pub skipped: Vec<FailureId>,
    /// Records whose state could not be written back.
    pub store_errors: Vec<SweepStoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStoreError {
    pub id: FailureId,
    pub message: String,
}

pub struct RetrySweep {
    registry: Arc<PlatformRegistry>,
    recovery: Arc<FailureRecoveryManager>,
    delivery_timeout: Duration,
}

impl std::fmt::Debug for RetrySweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySweep")
            .field("delivery_timeout", &self.delivery_timeout)
            .finish_non_exhaustive()
    }
}

impl RetrySweep {
    pub fn new(
        registry: Arc<PlatformRegistry>,
        recovery: Arc<FailureRecoveryManager>,
        delivery_timeout: Duration,
    ) -> Self {
        Self {
            registry,
            recovery,
            delivery_timeout,
        }
    }

    pub async fn run(&self, now: Timestamp) -> SweepReport {
        self.sweep(now)
            .instrument(info_span!("retry_sweep", %now))
            .await
    }

    async fn sweep(&self, now: Timestamp) -> SweepReport {
        let ready = self.recovery.list_retry_ready(now);
        let mut report = SweepReport {
            attempted: ready.len(),
            ..SweepReport::default()
        };

        for post in ready {
            let Some(deliverer) = self.registry.deliverer(&post.platform) else {
                warn!(failure_id = %post.id, platform = %post.platform, "No deliverer; retry skipped");
                report.skipped.push(post.id);
                continue;
            };

            match publish_with_timeout(deliverer.as_ref(), &post.artifact, self.delivery_timeout).await
            {
                Ok(receipt) => {
                    // A failed delete still forgets the record in memory, so
                    // the post is not sent twice by this process.
                    if let Err(error) = self.recovery.remove(&post.id) {
                        store_failed(&mut report, &post.platform, &post.id, &error);
                    }
                    audit::record(
                        AuditOutcome::RetrySucceeded,
                        &post.platform,
                        receipt.url.as_deref().unwrap_or_default(),
                    );
                    report.succeeded.push(post.id);
                }
                Err(delivery_error) => {
                    let outcome = match self
                        .recovery
                        .record_retry_attempt(&post.id, Some(delivery_error.message.clone()))
                    {
                        Ok(outcome) => outcome,
                        Err(error) => {
                            store_failed(&mut report, &post.platform, &post.id, &error);
                            continue;
                        }
                    };
                    match outcome {
                        RetryAttemptOutcome::Rescheduled(updated) => {
                            audit::record(
                                AuditOutcome::RetryRescheduled,
                                &post.platform,
                                &delivery_error.message,
                            );
                            info!(failure_id = %updated.id, next_retry = %updated.next_retry, "Retry rescheduled");
                            report.rescheduled.push(post.id);
                        }
                        RetryAttemptOutcome::Exhausted(_) => {
                            audit::record(
                                AuditOutcome::RetryExhausted,
                                &post.platform,
                                &delivery_error.message,
                            );
                            report.exhausted.push(post.id);
                        }
                        RetryAttemptOutcome::NotFound => report.skipped.push(post.id),
                    }
                }
            }
        }

        info!(
            attempted = report.attempted,
            succeeded = report.succeeded.len(),
            rescheduled = report.rescheduled.len(),
            exhausted = report.exhausted.len(),
            store_errors = report.store_errors.len(),
            "Retry sweep finished"
        );
        report
    }
}

fn store_failed(
    report: &mut SweepReport,
    platform: &PlatformId,
    id: &FailureId,
    error: &StoreError,
) {
    let message = error.to_string();
    audit::record(AuditOutcome::StoreFailed, platform, &message);
    report.store_errors.push(SweepStoreError {
        id: id.clone(),
        message,
    });
}
