//! Two-tier fingerprint cache.
//!
//! - **In-process tier**: a [`DashMap`] of [`CacheEntry`] values; reads never
//!   take a global lock.
//! - **Persistent tier**: one JSON file per entry under
//!   `{dir}/dna/{fingerprint}.json` or `{dir}/artifacts/{fingerprint}.json`.
//!
//! A `put` writes the file before the in-process entry becomes visible, so
//! nothing is served that would not survive a restart. Unreadable files are
//! treated as misses and deleted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use pipeline::{Clock, ContentFingerprint, Timestamp};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::files;
use crate::StoreError;

// ---------------------------------------------------------------------------
// Keys and entries
// ---------------------------------------------------------------------------

/// Partition of the cache. Each kind has its own directory and default TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheKind {
    Dna,
    Artifact,
}

impl CacheKind {
    pub const ALL: [CacheKind; 2] = [CacheKind::Dna, CacheKind::Artifact];

    fn dir_name(self) -> &'static str {
        match self {
            CacheKind::Dna => "dna",
            CacheKind::Artifact => "artifacts",
        }
    }
}

impl std::fmt::Display for CacheKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub kind: CacheKind,
    pub fingerprint: ContentFingerprint,
}

impl CacheKey {
    pub fn dna(fingerprint: ContentFingerprint) -> Self {
        Self {
            kind: CacheKind::Dna,
            fingerprint,
        }
    }

    pub fn artifact(fingerprint: ContentFingerprint) -> Self {
        Self {
            kind: CacheKind::Artifact,
            fingerprint,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.fingerprint)
    }
}

/// A cached value plus its bookkeeping.
///
/// Only `access_count` and `last_accessed` change after creation; a refresh
/// replaces the whole entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub value: serde_json::Value,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub access_count: u64,
    pub last_accessed: Timestamp,
}

impl CacheEntry {
    /// An entry is expired from the instant `now` reaches `expires_at`.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at.has_passed(now))
    }

    fn touch(&mut self, now: Timestamp) {
        self.access_count += 1;
        self.last_accessed = now;
    }
}

// ---------------------------------------------------------------------------
// Configuration and statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root of the persistent tier.
    pub dir: PathBuf,
    pub dna_ttl: Duration,
    pub artifact_ttl: Duration,
}

impl StoreConfig {
    /// Creates a config rooted at `dir` with the default TTLs (24h DNA, 6h artifacts).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            dna_ttl: Duration::from_secs(24 * 60 * 60),
            artifact_ttl: Duration::from_secs(6 * 60 * 60),
        }
    }

    pub fn ttl_for(&self, kind: CacheKind) -> Duration {
        match kind {
            CacheKind::Dna => self.dna_ttl,
            CacheKind::Artifact => self.artifact_ttl,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub memory_entries: usize,
    /// Sum of `access_count` over in-process entries.
    pub memory_accesses: u64,
    pub dna_files: usize,
    pub artifact_files: usize,
    pub disk_bytes: u64,
}

// ---------------------------------------------------------------------------
// FingerprintStore
// ---------------------------------------------------------------------------

/// Content-addressed cache shared by every pipeline component that needs it.
pub struct FingerprintStore {
    config: StoreConfig,
    memory: DashMap<CacheKey, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for FingerprintStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintStore")
            .field("config", &self.config)
            .field("memory_entries", &self.memory.len())
            .finish()
    }
}

impl FingerprintStore {
    /// Opens the store, creating the persistent directories if needed.
    pub fn open(config: StoreConfig, clock: Arc<dyn Clock>) -> Result<Self, StoreError> {
        for kind in CacheKind::ALL {
            files::ensure_dir(&config.dir.join(kind.dir_name()))?;
        }
        Ok(Self {
            config,
            memory: DashMap::new(),
            clock,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Deterministic fingerprint of `content`, optionally namespaced.
    pub fn fingerprint(content: &str, namespace: Option<&str>) -> ContentFingerprint {
        ContentFingerprint::of(content, namespace)
    }

    /// Returns the cached value for `key`, or `None` on a miss.
    ///
    /// Expired, unreadable, or undecodable entries count as misses and are
    /// evicted from both tiers.
    pub fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let entry = self.get_entry(key)?;
        match serde_json::from_value(entry.value) {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(key = %key, %error, "Cached value has an unexpected shape; evicting");
                self.evict(key);
                None
            }
        }
    }

    /// Returns the full entry for `key` after the expiry and promotion rules
    /// of [`get`](Self::get) have been applied.
    pub fn get_entry(&self, key: &CacheKey) -> Option<CacheEntry> {
        let now = self.clock.now();

        if let Some(mut entry) = self.memory.get_mut(key) {
            if !entry.is_expired(now) {
                entry.touch(now);
                debug!(key = %key, tier = "memory", "Cache hit");
                return Some(entry.clone());
            }
        }
        self.memory.remove_if(key, |_, entry| entry.is_expired(now));

        let path = self.path_for(key);
        let entry = self.read_persisted(key, &path)?;
        if entry.is_expired(now) {
            debug!(key = %key, "Persisted entry expired; removing");
            self.remove_file_logged(&path);
            return None;
        }

        let mut promoted = self.memory.entry(key.clone()).or_insert(entry);
        promoted.touch(now);
        debug!(key = %key, tier = "disk", "Cache hit; promoted to memory");
        Some(promoted.clone())
    }

    /// Stores `value` under `key` with the default TTL for its kind.
    pub fn put<T: Serialize>(&self, key: &CacheKey, value: &T) -> Result<(), StoreError> {
        self.put_with_ttl(key, value, Some(self.config.ttl_for(key.kind)))
    }

    /// Stores `value` under `key`. `None` means the entry never expires;
    /// `Some(Duration::ZERO)` is stored already expired.
    pub fn put_with_ttl<T: Serialize>(
        &self,
        key: &CacheKey,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialization {
            path: path.clone(),
            source,
        })?;

        let now = self.clock.now();
        let entry = CacheEntry {
            key: key.clone(),
            value,
            created_at: now,
            expires_at: ttl.map(|ttl| now.plus(ttl)),
            access_count: 0,
            last_accessed: now,
        };

        // The synced temp file is written before the slot is taken; holding the
        // slot only covers the rename, which serializes writers of this key.
        let staged = files::stage_json(&path, &entry)?;
        let slot = self.memory.entry(key.clone());
        staged.commit()?;
        match slot {
            Entry::Occupied(mut occupied) => {
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(entry);
            }
        }
        debug!(key = %key, "Cache entry stored");
        Ok(())
    }

    /// Removes `key` from both tiers. Returns whether anything was removed.
    pub fn remove(&self, key: &CacheKey) -> Result<bool, StoreError> {
        let in_memory = self.memory.remove(key).is_some();
        let on_disk = files::remove_if_exists(&self.path_for(key))?;
        Ok(in_memory || on_disk)
    }

    /// Removes every expired entry from both tiers, plus unreadable files.
    ///
    /// Returns the number of distinct keys removed.
    pub fn invalidate_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let mut removed: HashSet<PathBuf> = HashSet::new();

        self.memory.retain(|key, entry| {
            if entry.is_expired(now) {
                removed.insert(self.path_for(key));
                false
            } else {
                true
            }
        });

        for kind in CacheKind::ALL {
            for path in files::record_files(&self.kind_dir(kind))? {
                let expired = match read_entry(&path) {
                    Ok(entry) => entry.is_expired(now),
                    Err(reason) => {
                        warn!(path = %path.display(), %reason, "Removing unreadable cache file");
                        true
                    }
                };
                if expired {
                    files::remove_if_exists(&path)?;
                    removed.insert(path);
                }
            }
        }

        debug!(removed = removed.len(), "Expired cache entries removed");
        Ok(removed.len())
    }

    pub fn stats(&self) -> Result<CacheStats, StoreError> {
        let mut stats = CacheStats {
            memory_entries: self.memory.len(),
            memory_accesses: self.memory.iter().map(|e| e.access_count).sum(),
            ..CacheStats::default()
        };

        for kind in CacheKind::ALL {
            let paths = files::record_files(&self.kind_dir(kind))?;
            for path in &paths {
                let metadata = std::fs::metadata(path).map_err(|e| StoreError::io(path, e))?;
                stats.disk_bytes += metadata.len();
            }
            match kind {
                CacheKind::Dna => stats.dna_files = paths.len(),
                CacheKind::Artifact => stats.artifact_files = paths.len(),
            }
        }
        Ok(stats)
    }

    // -- private helpers ---------------------------------------------------

    fn kind_dir(&self, kind: CacheKind) -> PathBuf {
        self.config.dir.join(kind.dir_name())
    }

    fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.kind_dir(key.kind)
            .join(format!("{}.{}", key.fingerprint, files::RECORD_EXTENSION))
    }

    fn read_persisted(&self, key: &CacheKey, path: &Path) -> Option<CacheEntry> {
        if !path.exists() {
            return None;
        }
        match read_entry(path) {
            Ok(entry) if entry.key == *key => Some(entry),
            Ok(_) => {
                warn!(key = %key, "Persisted entry belongs to another key; removing");
                self.remove_file_logged(path);
                None
            }
            Err(reason) => {
                warn!(key = %key, %reason, "Corrupted cache entry; removing");
                self.remove_file_logged(path);
                None
            }
        }
    }

    fn evict(&self, key: &CacheKey) {
        self.memory.remove(key);
        self.remove_file_logged(&self.path_for(key));
    }

    fn remove_file_logged(&self, path: &Path) {
        if let Err(error) = files::remove_if_exists(path) {
            warn!(path = %path.display(), %error, "Could not remove cache file");
        }
    }
}

fn read_entry(path: &Path) -> Result<CacheEntry, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    serde_json::from_slice(&bytes).map_err(|e| e.to_string())
}
