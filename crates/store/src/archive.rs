//! Publish results archive.
//!
//! Each publish run can be written to `{dir}/publish_results_{YYYYMMDD_HHMMSS}.json`
//! as an audit trail of what went where.

use std::path::{Path, PathBuf};

use pipeline::Timestamp;
use serde::Serialize;
use tracing::info;

use crate::files;
use crate::StoreError;

#[derive(Debug, Clone)]
pub struct ResultsArchive {
    dir: PathBuf,
}

impl ResultsArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `report` and returns the path of the new file.
    ///
    /// A second report within the same second replaces the first.
    pub fn save<T: Serialize>(&self, report: &T, at: Timestamp) -> Result<PathBuf, StoreError> {
        files::ensure_dir(&self.dir)?;
        let name = format!(
            "publish_results_{}.{}",
            at.as_datetime().format("%Y%m%d_%H%M%S"),
            files::RECORD_EXTENSION
        );
        let path = self.dir.join(name);
        files::write_json_atomic(&path, report)?;
        info!(path = %path.display(), "Publish results archived");
        Ok(path)
    }
}
