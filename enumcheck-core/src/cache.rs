//! Incremental analysis cache using SHA-256 for robust change detection.
//!
//! Caches per-file findings keyed on the file's content hash, so re-analysis
//! only does work for changed class files.
//!
//! # Cache Versioning
//!
//! The cache includes version metadata to ensure invalidation when:
//! - The enumcheck version changes (may have different detection logic)
//! - The cache format changes
//!
//! # Cross-file soundness
//!
//! A finding depends on *other* classes' metadata (the enum-ness and
//! interfaces of key types), so cached findings are only reused when a
//! fingerprint over the whole class-metadata index matches as well as the
//! file hash. Any metadata change anywhere invalidates all cached findings.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::detect::ClassAnalysis;
use crate::error::{EnumcheckError, EnumcheckResult};
use crate::metadata::ClassIndex;

/// Maximum cache file size (50MB) - prevents unbounded cache growth
const MAX_CACHE_SIZE_BYTES: usize = 50_000_000;

/// Current cache format version. Increment when cache format changes.
const CACHE_VERSION: u32 = 1;

/// Enumcheck version for cache compatibility checking.
const ENUMCHECK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Cache file name, relative to the scan root.
const CACHE_FILE: &str = ".enumcheck_cache.json";

/// Cached analysis of one class file.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CachedClass {
    /// SHA-256 of the file content
    pub hash: String,
    /// The per-class analysis result produced from that content
    pub analysis: ClassAnalysis,
}

/// Cache metadata for version checking.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct CacheMetadata {
    /// Cache format version
    pub cache_version: u32,
    /// Enumcheck version that created this cache
    pub enumcheck_version: String,
    /// Timestamp when cache was created
    #[serde(default)]
    pub created_at: u64,
    /// Fingerprint of the class-metadata index the findings were judged against
    #[serde(default)]
    pub index_fingerprint: String,
}

impl CacheMetadata {
    /// Create metadata for the current environment and index.
    pub fn current(index_fingerprint: String) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self {
            cache_version: CACHE_VERSION,
            enumcheck_version: ENUMCHECK_VERSION.to_string(),
            created_at,
            index_fingerprint,
        }
    }

    /// Whether cached findings may be reused against the given index.
    pub fn is_compatible(&self, index_fingerprint: &str) -> bool {
        self.cache_version == CACHE_VERSION
            && self.enumcheck_version == ENUMCHECK_VERSION
            && self.index_fingerprint == index_fingerprint
    }
}

/// The on-disk cache: metadata plus per-path cached analyses.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct EnumcheckCache {
    #[serde(default)]
    pub metadata: CacheMetadata,
    pub classes: HashMap<String, CachedClass>,
}

/// SHA-256 hash of raw file content, as lowercase hex.
pub fn file_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Fingerprint of the whole metadata index (order-independent).
pub fn index_fingerprint(index: &ClassIndex) -> String {
    let mut hasher = Sha256::new();
    for (name, meta) in index.sorted_entries() {
        hasher.update(name.as_bytes());
        hasher.update([meta.is_enum as u8]);
        hasher.update((meta.interface_count as u64).to_be_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Loads the cache from the root directory, if present and well-formed.
///
/// A corrupt or oversized cache is treated as absent (resilient behavior);
/// the next save overwrites it.
pub fn load_cache(root: &Path) -> Option<EnumcheckCache> {
    let path = root.join(CACHE_FILE);
    let content = fs::read_to_string(&path).ok()?;
    if content.len() > MAX_CACHE_SIZE_BYTES {
        debug!(path = %path.display(), "cache exceeds size limit, ignoring");
        return None;
    }
    match serde_json::from_str(&content) {
        Ok(cache) => Some(cache),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "unreadable cache, ignoring");
            None
        }
    }
}

/// Saves the cache to the root directory.
pub fn save_cache(root: &Path, cache: &EnumcheckCache) -> EnumcheckResult<()> {
    let path = root.join(CACHE_FILE);
    let content = serde_json::to_string(cache)
        .map_err(|e| EnumcheckError::cache(format!("serialization failed: {}", e)))?;
    if content.len() > MAX_CACHE_SIZE_BYTES {
        return Err(EnumcheckError::cache("cache exceeds size limit, not saved"));
    }
    fs::write(&path, content)
        .map_err(|e| EnumcheckError::cache(format!("write failed at {}: {}", path.display(), e)))
}
