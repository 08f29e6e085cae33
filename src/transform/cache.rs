//! Keyed on-disk persistence of heavy-transform results with TTL.
//!
//! Entries live in a per-user cache directory, one JSON file per key. The
//! key is a hash over the file content, the transformer name, and its
//! options, so any change to either side is a miss. Writes take an
//! exclusive file lock; failures on either side are logged and treated as
//! misses, never as pipeline errors.

use crate::errors::{Error, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A cached transform result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedTransform {
    /// Transformed textual content.
    pub content: String,
    /// Whether the record should be marked `transformed`.
    pub transformed: bool,
}

#[derive(Serialize, Deserialize)]
struct Entry {
    created_unix_secs: u64,
    ttl_secs: u64,
    result: CachedTransform,
}

/// On-disk TTL cache for heavy-transform results.
#[derive(Debug, Clone)]
pub struct TransformCache {
    dir: PathBuf,
    ttl: Duration,
}

impl TransformCache {
    /// Opens the cache in the OS-appropriate per-user location.
    pub fn open_default(ttl: Duration) -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "copytree")
            .ok_or_else(|| Error::Cache("no usable cache directory".into()))?;
        Self::at(dirs.cache_dir().join("transforms"), ttl)
    }

    /// Opens the cache at an explicit directory (used by tests).
    pub fn at<P: Into<PathBuf>>(dir: P, ttl: Duration) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| Error::Cache(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir, ttl })
    }

    /// Computes the cache key for a (content, transformer, options) triple.
    pub fn key(content: &[u8], transformer: &str, options: &serde_json::Value) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        hasher.update([0]);
        hasher.update(transformer.as_bytes());
        hasher.update([0]);
        hasher.update(options.to_string().as_bytes());
        hex::encode(hasher.finalize())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Looks a key up. Expired entries are removed and reported as misses;
    /// unreadable entries are misses.
    pub fn get(&self, key: &str) -> Option<CachedTransform> {
        let path = self.entry_path(key);
        let body = fs::read_to_string(&path).ok()?;
        let entry: Entry = match serde_json::from_str(&body) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("discarding corrupt cache entry {}: {e}", path.display());
                let _ = fs::remove_file(&path);
                return None;
            }
        };
        let now = unix_now();
        if now.saturating_sub(entry.created_unix_secs) > entry.ttl_secs {
            debug!("cache entry {key} expired");
            let _ = fs::remove_file(&path);
            return None;
        }
        Some(entry.result)
    }

    /// Stores a result under the key. Failures log and return quietly.
    pub fn put(&self, key: &str, result: &CachedTransform) {
        let entry = Entry {
            created_unix_secs: unix_now(),
            ttl_secs: self.ttl.as_secs(),
            result: result.clone(),
        };
        let body = match serde_json::to_vec(&entry) {
            Ok(body) => body,
            Err(e) => {
                warn!("cache serialize failed for {key}: {e}");
                return;
            }
        };
        let path = self.entry_path(key);
        if let Err(e) = write_locked(&path, &body) {
            warn!("cache write failed for {}: {e}", path.display());
        }
    }

    /// Removes every entry; used by cache maintenance.
    pub fn clear(&self) -> Result<()> {
        for entry in
            fs::read_dir(&self.dir).map_err(|e| Error::Cache(format!("read dir: {e}")))?
        {
            let entry = entry.map_err(|e| Error::Cache(e.to_string()))?;
            if entry.path().extension().is_some_and(|e| e == "json") {
                let _ = fs::remove_file(entry.path());
            }
        }
        Ok(())
    }
}

fn write_locked(path: &std::path::Path, body: &[u8]) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;
    fs2::FileExt::lock_exclusive(&file)?;
    let result = file.write_all(body).and_then(|()| file.flush());
    let _ = fs2::FileExt::unlock(&file);
    result
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
