/*!
 * Best-effort transcript cache.
 *
 * One JSON file per video id. Unreadable or corrupt entries degrade to a
 * cache miss; the cache never fails a fetch request.
 */

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::youtube::Transcript;

/// Default directory name under the user's data directory
const DEFAULT_CACHE_DIRNAME: &str = "tubesub";

/// Disk store for fetched transcripts, keyed by video id
#[derive(Debug, Clone)]
pub struct TranscriptCache {
    /// Directory holding one JSON file per video
    dir: PathBuf,
}

impl TranscriptCache {
    /// Create a cache rooted at the given directory
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        TranscriptCache { dir: dir.into() }
    }

    /// Create a cache at the default location
    pub fn new_default() -> Result<Self> {
        Ok(Self::new(Self::default_cache_dir()?))
    }

    /// Resolve the default cache directory
    pub fn default_cache_dir() -> Result<PathBuf> {
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_CACHE_DIRNAME).join("cache"))
    }

    /// Directory this cache writes into
    pub fn path(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, video_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", video_id))
    }

    /// Look up a cached transcript. Any read or parse problem is a miss.
    pub fn get(&self, video_id: &str) -> Option<Transcript> {
        let path = self.entry_path(video_id);
        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("Error reading cache entry {}: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str(&data) {
            Ok(transcript) => {
                debug!("Cache hit for video {}", video_id);
                Some(transcript)
            }
            Err(e) => {
                warn!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Store a transcript, replacing any previous entry. The file lands via a
    /// temporary sibling so readers never observe a partial write.
    pub fn put(&self, video_id: &str, transcript: &Transcript) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create cache directory {}", self.dir.display()))?;

        let data = serde_json::to_vec(transcript).context("Failed to serialize transcript")?;

        let mut tmp = NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("Failed to create temp file in {}", self.dir.display()))?;
        tmp.write_all(&data).context("Failed to write cache entry")?;

        let path = self.entry_path(video_id);
        tmp.persist(&path)
            .with_context(|| format!("Failed to persist cache entry {}", path.display()))?;

        debug!("Cached transcript for video {}", video_id);
        Ok(())
    }
}
