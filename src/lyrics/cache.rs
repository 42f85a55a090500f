//! On-disk cache of raw lyrics responses, one file per track.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{Lyrics, parse_response};
use crate::storage;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    #[serde(rename = "savedAt")]
    saved_at: i64,
    body: Box<RawValue>,
}

#[derive(Debug, Clone)]
pub struct LyricsCache {
    dir: PathBuf,
}

impl LyricsCache {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    /// File holding the entry for `track_id`. Named by a SHA-256 of the ID so
    /// arbitrary input can't escape the cache directory.
    pub fn entry_path(&self, track_id: &str) -> PathBuf {
        let digest = Sha256::digest(track_id.as_bytes());
        self.dir.join(format!("{}.json", hex::encode(digest)))
    }

    /// Cached lyrics younger than `ttl`. Every failure is a miss.
    pub fn read(&self, track_id: &str, ttl: Duration) -> Option<Lyrics> {
        if track_id.is_empty() || ttl.is_zero() {
            return None;
        }
        let path = self.entry_path(track_id);
        let raw = storage::read_optional(&path)?;
        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("lyrics cache {}: {e}", path.display());
                return None;
            }
        };
        if entry.saved_at <= 0 || entry.body.get().trim().is_empty() {
            return None;
        }
        let age = crate::unix_now_secs().saturating_sub(entry.saved_at);
        let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        if age > max_age {
            tracing::debug!("lyrics cache for {track_id} expired ({age}s old)");
            return None;
        }
        parse_response(entry.body.get().as_bytes()).ok()
    }

    /// Store a raw response body. Callers treat failure as non-fatal.
    pub fn write(&self, track_id: &str, body: &[u8]) -> anyhow::Result<()> {
        if track_id.is_empty() || body.is_empty() {
            return Ok(());
        }
        let body = RawValue::from_string(String::from_utf8(body.to_vec())?)?;
        let entry = CacheEntry {
            saved_at: crate::unix_now_secs(),
            body,
        };
        let raw = serde_json::to_vec(&entry)?;
        storage::write_atomic(&self.entry_path(track_id), &raw)?;
        Ok(())
    }
}
