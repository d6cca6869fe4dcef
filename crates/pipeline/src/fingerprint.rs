//! Content fingerprints used as cache keys.
//!
//! A fingerprint is the SHA-256 of the normalized input, hex-encoded and
//! truncated to [`FINGERPRINT_HEX_LEN`] characters, optionally prefixed with a
//! namespace (`{namespace}_{hash}`). Normalization converts CRLF line endings to
//! LF and trims surrounding whitespace, so cosmetic differences in the source
//! file do not defeat the cache.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{ContentDna, PlatformId};

/// Number of hex characters kept from the digest (64 bits).
pub const FINGERPRINT_HEX_LEN: usize = 16;

/// A stable identifier derived from normalized content.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(String);

impl ContentFingerprint {
    /// Fingerprints `content`, optionally under `namespace`.
    pub fn of(content: &str, namespace: Option<&str>) -> Self {
        let digest = Sha256::digest(normalize(content).as_bytes());
        let hash = &hex::encode(digest)[..FINGERPRINT_HEX_LEN];
        match namespace {
            Some(ns) if !ns.is_empty() => Self(format!("{ns}_{hash}")),
            _ => Self(hash.to_string()),
        }
    }

    /// Fingerprints a DNA record via its canonical JSON form.
    ///
    /// Struct fields serialize in declaration order, so equal records always
    /// produce identical bytes.
    pub fn of_dna(dna: &ContentDna) -> Self {
        let canonical = serde_json::to_string(dna).unwrap_or_default();
        Self::of(&canonical, None)
    }

    /// Key for the artifact generated from this (DNA) fingerprint for `platform`.
    pub fn for_platform(&self, platform: &PlatformId) -> Self {
        Self(format!("{}_{}", platform, self.0))
    }

    /// Returns the fingerprint as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn normalize(content: &str) -> String {
    content.replace("\r\n", "\n").trim().to_string()
}
