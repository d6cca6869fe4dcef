//! Fixed escalating retry delays for failed deliveries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CrosspostError;

/// Retry delay table indexed by attempt count.
///
/// `delay(n)` returns entry `min(n, len) - 1`; once the table is exhausted the
/// last delay repeats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Duration>", into = "Vec<Duration>")]
pub struct BackoffSchedule {
    steps: Vec<Duration>,
}

impl TryFrom<Vec<Duration>> for BackoffSchedule {
    type Error = CrosspostError;

    fn try_from(steps: Vec<Duration>) -> Result<Self, Self::Error> {
        Self::new(steps)
    }
}

impl From<BackoffSchedule> for Vec<Duration> {
    fn from(schedule: BackoffSchedule) -> Self {
        schedule.steps
    }
}

impl BackoffSchedule {
    /// Builds a schedule, rejecting an empty table.
    pub fn new(steps: Vec<Duration>) -> Result<Self, CrosspostError> {
        if steps.is_empty() {
            return Err(CrosspostError::ConfigurationError {
                message: "backoff schedule needs at least one delay".to_string(),
            });
        }
        Ok(Self { steps })
    }

    /// Builds a schedule from whole minutes.
    pub fn from_minutes(minutes: &[u64]) -> Result<Self, CrosspostError> {
        Self::new(minutes.iter().map(|m| Duration::from_secs(m * 60)).collect())
    }

    /// Delay before the retry that follows attempt number `attempt_count`.
    ///
    /// Attempt counts start at 1; 0 is treated as 1.
    pub fn delay(&self, attempt_count: u32) -> Duration {
        let attempt = usize::try_from(attempt_count.max(1)).unwrap_or(usize::MAX);
        let index = attempt.min(self.steps.len()) - 1;
        self.steps[index]
    }

    pub fn steps(&self) -> &[Duration] {
        &self.steps
    }
}

impl Default for BackoffSchedule {
    /// 1 minute, 5 minutes, 30 minutes.
    fn default() -> Self {
        Self {
            steps: vec![
                Duration::from_secs(60),
                Duration::from_secs(5 * 60),
                Duration::from_secs(30 * 60),
            ],
        }
    }
}
