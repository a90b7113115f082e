use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::stem::StemKey;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to write cache file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// What a completed PR left behind in the note store.
///
/// Appends to a shared page have nothing addressable to record, so they
/// store `true`; standalone pages store their page id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheMarker {
    Appended(bool),
    Page(String),
}

/// Stem → completion marker, persisted as a key-ordered JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncCache {
    entries: BTreeMap<String, CacheMarker>,
}

impl SyncCache {
    /// Load the cache at `path`. A missing or unreadable file is an empty
    /// cache.
    pub fn load(path: &Path) -> SyncCache {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                debug!(path = %path.display(), error = %err, "no cache file; starting empty");
                return SyncCache::default();
            }
        };
        match serde_json::from_str(&contents) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cache file is not valid; starting empty");
                SyncCache::default()
            }
        }
    }

    /// Replace the file at `path` with this cache: the JSON is written to a
    /// sibling temp file, then renamed over the target.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        let write_err = |source| CacheError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let mut tmp: OsString = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(write_err)?;
        fs::rename(&tmp, path).map_err(write_err)?;
        debug!(path = %path.display(), entries = self.entries.len(), "saved cache");
        Ok(())
    }

    pub fn contains(&self, stem: &StemKey) -> bool {
        self.entries.contains_key(stem.as_str())
    }

    #[cfg(test)]
    pub fn get(&self, stem: &StemKey) -> Option<&CacheMarker> {
        self.entries.get(stem.as_str())
    }

    pub fn insert(&mut self, stem: &StemKey, marker: CacheMarker) {
        self.entries.insert(stem.to_string(), marker);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
