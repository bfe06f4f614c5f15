//! Cache of stream resolutions.
//!
//! Each stream has a file under `cache/` holding the short version string of
//! its last resolution. The file's modification time is the write time; an
//! entry older than [`FRESHNESS_WINDOW`] is a miss so the release feed is
//! consulted again at most once a day.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::debug;

use super::store::Store;
use super::version::{GodotVersion, Stream};

/// How long a cached resolution stays valid.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Stream resolutions persisted in the store.
#[derive(Debug, Clone)]
pub struct StreamCache {
    dir: PathBuf,
}

impl StreamCache {
    #[must_use]
    pub fn new(store: &Store) -> Self {
        Self {
            dir: store.cache_dir(),
        }
    }

    #[must_use = "returns the path without side effects"]
    pub fn entry_path(&self, stream: Stream) -> PathBuf {
        self.dir.join(stream.as_str())
    }

    /// Returns the cached version for `stream`, or `None` on a miss.
    ///
    /// Missing, stale, empty and half-written entries are all misses.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read or holds an invalid version.
    pub fn get(&self, stream: Stream) -> Result<Option<GodotVersion>> {
        let path = self.entry_path(stream);
        debug!("Checking for cached Godot release from '{}'", path.display());

        let meta = match std::fs::metadata(&path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Nothing cached");
                return Ok(None);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to stat {}", path.display()));
            }
        };

        let modified = meta
            .modified()
            .with_context(|| format!("Failed to read mtime of {}", path.display()))?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > FRESHNESS_WINDOW {
            debug!("Cache is more than a day old - busting");
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let Some(line) = content.strip_suffix('\n').filter(|l| !l.is_empty()) else {
            debug!("Nothing cached");
            return Ok(None);
        };

        debug!("Cached {stream} Godot is: {line}");
        Ok(Some(GodotVersion::parse(line).with_context(|| {
            format!("Invalid cached release in {}", path.display())
        })?))
    }

    /// Records `version` as the current resolution of `stream`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be written.
    pub fn set(&self, stream: Stream, version: &GodotVersion) -> Result<()> {
        let path = self.entry_path(stream);
        std::fs::write(&path, format!("{version}\n"))
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}
