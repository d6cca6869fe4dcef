//! Filesystem helpers shared by the persistent stores.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use uuid::Uuid;

use crate::StoreError;

/// Extension of every persisted record.
pub(crate) const RECORD_EXTENSION: &str = "json";

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::io(dir, e))
}

/// Serializes `value` and replaces `path` with it in one rename.
///
/// Concurrent readers see either the previous file or the complete new one.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    stage_json(path, value)?.commit()
}

/// Writes and syncs `value` to a temp file next to `path` without touching
/// `path` itself. The slow part of an atomic write happens here, so callers
/// can stage before taking a lock and only [`commit`](StagedWrite::commit)
/// while holding it.
pub(crate) fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<StagedWrite, StoreError> {
    let bytes = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Serialization {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path_for(path);
    let written = fs::File::create(&tmp).and_then(|mut file| {
        file.write_all(&bytes)?;
        file.sync_all()
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(StoreError::io(&tmp, e));
    }
    Ok(StagedWrite {
        tmp: Some(tmp),
        target: path.to_path_buf(),
    })
}

/// A synced temp file waiting to replace its target. Dropped uncommitted,
/// the temp file is deleted.
#[derive(Debug)]
pub(crate) struct StagedWrite {
    tmp: Option<PathBuf>,
    target: PathBuf,
}

impl StagedWrite {
    pub(crate) fn commit(mut self) -> Result<(), StoreError> {
        let Some(tmp) = self.tmp.take() else {
            return Ok(());
        };
        fs::rename(&tmp, &self.target).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            StoreError::io(&self.target, e)
        })
    }
}

impl Drop for StagedWrite {
    fn drop(&mut self) {
        if let Some(tmp) = self.tmp.take() {
            let _ = fs::remove_file(tmp);
        }
    }
}

/// Removes `path`, returning whether it existed.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, StoreError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}

/// Lists the record files directly under `dir`. A missing directory is empty.
pub(crate) fn record_files(dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| StoreError::io(dir, e))?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == RECORD_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

pub(crate) fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_write_replaces_and_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");

        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2})).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains('2'));
        assert_eq!(record_files(dir.path()).unwrap(), vec![path]);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn uncommitted_stage_leaves_target_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record.json");
        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();

        let staged = stage_json(&path, &serde_json::json!({"v": 2})).unwrap();
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
        drop(staged);

        assert!(fs::read_to_string(&path).unwrap().contains('1'));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn missing_directory_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(record_files(&dir.path().join("absent")).unwrap().is_empty());
    }

    #[test]
    fn removing_a_missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!remove_if_exists(&dir.path().join("x.json")).unwrap());
    }
}
