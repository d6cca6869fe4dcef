use pipeline::{CrosspostError, GenerationError, PlatformId, RetryPolicy};
use thiserror::Error;

/// Failure of a single orchestration step.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Pipeline(#[from] CrosspostError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl NodeError {
    /// Pipeline-level errors and rejected credentials stop the run; other
    /// generation errors only affect one platform.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Pipeline(_) => true,
            Self::Generation(err) => err.is_fatal(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Pipeline(_) => RetryPolicy::NonRetryable,
            Self::Generation(err) => err.retry_policy(),
        }
    }

    /// Converts a fatal step failure into the error that ends the run.
    pub(crate) fn into_run_error(self, platform: &PlatformId) -> CrosspostError {
        match self {
            Self::Pipeline(err) => err,
            Self::Generation(source) => CrosspostError::GenerationRejected {
                platform: platform.to_string(),
                source,
            },
        }
    }
}
