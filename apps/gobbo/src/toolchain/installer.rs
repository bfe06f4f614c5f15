//! Installation of official Godot builds into the store.
//!
//! An install runs download, extract and normalize entirely inside `tmp/`
//! and only then swaps the result into `bin/official/<version>`. Any failure
//! before the swap leaves an existing installation untouched.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::archive::extract_zip;
use super::download::{Downloader, ProgressCallback};
use super::normalize::normalizer_for;
use super::store::Store;
use super::version::{ArtifactKind, GodotVersion};
use crate::errors::GobboError;

/// Age after which scratch entries are swept.
pub const TEMP_EXPIRY: Duration = Duration::from_secs(31 * 24 * 60 * 60);

/// Directory holding export templates inside an installation.
pub const TEMPLATES_DIR: &str = "templates";

/// Installs and locates Godot builds in a store.
#[derive(Clone)]
pub struct Installer {
    store: Store,
    download_host: String,
    downloader: Downloader,
}

impl Installer {
    /// Creates an installer fetching artifacts from `download_host`.
    #[must_use]
    pub fn new(store: Store, download_host: impl Into<String>) -> Self {
        let downloader = Downloader::new(store.tmp_dir());
        Self {
            store,
            download_host: download_host.into(),
            downloader,
        }
    }

    /// Reports download progress to `callback` instead of printing it.
    #[must_use]
    pub fn with_callback(mut self, callback: ProgressCallback) -> Self {
        self.downloader = self.downloader.with_callback(callback);
        self
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Directory holding everything installed for `version`.
    #[must_use = "returns the path without side effects"]
    pub fn install_dir(&self, version: &GodotVersion) -> PathBuf {
        self.store
            .join(["bin", "official", version.to_string().as_str()])
    }

    /// Path of the installed editor artifact for `version`.
    #[must_use = "returns the path without side effects"]
    pub fn installed_path(&self, version: &GodotVersion) -> PathBuf {
        self.store
            .bin_dir()
            .join(version.binary_relative_path(self.store.platform()))
    }

    /// Returns whether the editor artifact for `version` exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact's existence cannot be determined.
    pub fn is_installed(&self, version: &GodotVersion) -> Result<bool> {
        let path = self.installed_path(version);
        match std::fs::symlink_metadata(&path) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(GobboError::io(format!("Failed to stat {}", path.display()), e).into()),
        }
    }

    /// Downloads and installs the editor for `version`, replacing any
    /// existing installation.
    ///
    /// # Errors
    ///
    /// Returns an error if the download, extraction, normalization or final
    /// swap fails. The previous installation survives every failure except
    /// one in the swap itself.
    pub async fn install(&self, version: &GodotVersion) -> Result<()> {
        let platform = self.store.platform();
        let url = version.download_url_on(&self.download_host, platform, ArtifactKind::Editor);
        info!("Installing Godot {version} for {platform}");

        let scratch = self.fetch_and_extract(&url).await?;

        let staged = normalizer_for(platform)
            .normalize(&scratch, version)
            .and_then(|()| self.replace(&scratch, &self.install_dir(version)));
        if let Err(e) = staged {
            remove_best_effort(&scratch);
            return Err(e);
        }

        info!("Installed Godot {version}");
        Ok(())
    }

    /// Downloads the export templates for `version` into its installation.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::NotInstalled`] if the editor is not installed,
    /// [`GobboError::ExpectedDirectory`] if the archive has no `templates`
    /// directory, or any download or extraction error.
    pub async fn install_export_templates(&self, version: &GodotVersion) -> Result<()> {
        let install_dir = self.install_dir(version);
        if !install_dir.is_dir() {
            return Err(GobboError::NotInstalled {
                version: version.to_string(),
            }
            .into());
        }

        let url = version.download_url_on(
            &self.download_host,
            self.store.platform(),
            ArtifactKind::ExportTemplates,
        );
        info!("Installing export templates for Godot {version}");

        let scratch = self.fetch_and_extract(&url).await?;
        let templates = scratch.join(TEMPLATES_DIR);

        let staged = if templates.is_dir() {
            self.replace(&templates, &install_dir.join(TEMPLATES_DIR))
        } else {
            Err(GobboError::ExpectedDirectory {
                dir: scratch.clone(),
            }
            .into())
        };
        remove_best_effort(&scratch);
        staged?;

        info!("Installed export templates for Godot {version}");
        Ok(())
    }

    /// Removes every entry of `tmp/` older than [`TEMP_EXPIRY`].
    ///
    /// Entries that cannot be inspected or removed are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if `tmp/` itself cannot be listed.
    pub fn cleanup_expired_temp(&self) -> Result<()> {
        let tmp_dir = self.store.tmp_dir();
        let now = SystemTime::now();

        let entries = std::fs::read_dir(&tmp_dir)
            .with_context(|| format!("Failed to read directory: {}", tmp_dir.display()))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Couldn't read entry in {}: {e}", tmp_dir.display());
                    continue;
                }
            };
            let path = entry.path();

            let modified = match entry.metadata().and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Couldn't stat '{}': {e}", path.display());
                    continue;
                }
            };

            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            if age <= TEMP_EXPIRY {
                continue;
            }

            debug!("Removing expired temp entry {}", path.display());
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            let removed = if is_dir {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            if let Err(e) = removed {
                warn!("Couldn't remove '{}': {e}", path.display());
            }
        }

        Ok(())
    }

    /// Downloads `url` and extracts it into a fresh scratch directory.
    ///
    /// The downloaded archive is removed once extracted. An archive that
    /// fails to extract is removed too, so the next attempt fetches it anew.
    async fn fetch_and_extract(&self, url: &str) -> Result<PathBuf> {
        let archive = self.downloader.download(url).await?;

        let scratch = self
            .store
            .tmp_dir()
            .join(format!("extract-{:016x}", rand::random::<u64>()));
        debug!("Extracting {} to {}", archive.display(), scratch.display());

        if let Err(e) = extract_zip(&archive, &scratch) {
            remove_best_effort(&scratch);
            self.downloader.discard(url);
            return Err(e);
        }

        self.downloader.discard(url);
        Ok(scratch)
    }

    /// Moves `staged` to `dest`, removing whatever `dest` held before.
    fn replace(&self, staged: &Path, dest: &Path) -> Result<()> {
        match std::fs::remove_dir_all(dest) {
            Ok(()) => debug!("Removed previous installation at {}", dest.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(GobboError::io(format!("Failed to remove {}", dest.display()), e).into());
            }
        }

        std::fs::rename(staged, dest).with_context(|| {
            format!("Failed to move {} to {}", staged.display(), dest.display())
        })
    }
}

fn remove_best_effort(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!("Couldn't remove '{}': {e}", dir.display());
    }
}
