//! Version resolution and the install-then-run entry points used by commands.

use std::convert::Infallible;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, warn};

use super::config::Settings;
use super::installer::Installer;
use super::releases::ReleaseFeed;
use super::store::Store;
use super::stream_cache::StreamCache;
use super::supervisor;
use super::version::{GodotVersion, Stream};
use crate::errors::GobboError;

/// When [`Toolchain::ensure_installed`] may download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Never install; a missing version is an error.
    Never,
    /// Install only if the version is missing.
    IfAbsent,
    /// Always (re)install.
    Always,
}

/// A store together with the services that populate it.
#[derive(Clone)]
pub struct Toolchain {
    feed: ReleaseFeed,
    cache: StreamCache,
    installer: Installer,
}

impl Toolchain {
    #[must_use]
    pub fn new(store: Store, settings: &Settings) -> Self {
        Self {
            feed: ReleaseFeed::new(settings.releases_api.as_str()),
            cache: StreamCache::new(&store),
            installer: Installer::new(store, settings.download_host.as_str()),
        }
    }

    #[must_use]
    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    /// Turns user input into a concrete version.
    ///
    /// Stream names are resolved through the stream cache, falling back to
    /// the release feed. Returns `None` when a stream is named, or implied by
    /// `default_to_stable`, but streams are not allowed, or when nothing was
    /// given and `default_to_stable` is off.
    ///
    /// # Errors
    ///
    /// Returns parse errors for malformed input and lookup errors when a
    /// stream has to be fetched remotely and that fails.
    pub async fn resolve_version(
        &self,
        explicit: Option<&str>,
        allow_stream: bool,
        default_to_stable: bool,
    ) -> Result<Option<GodotVersion>> {
        let text = match explicit {
            Some(text) => text,
            None if default_to_stable => Stream::Stable.as_str(),
            None => return Ok(None),
        };

        match Stream::from_name(text) {
            Some(stream) if allow_stream => self.stream_version(stream).await.map(Some),
            Some(stream) => {
                debug!("Not resolving {stream}: streams are not allowed here");
                Ok(None)
            }
            None => GodotVersion::parse_with_stream(text, allow_stream, &self.feed).await,
        }
    }

    async fn stream_version(&self, stream: Stream) -> Result<GodotVersion> {
        match self.cache.get(stream) {
            Ok(Some(version)) => {
                debug!("Using cached {stream} release {version}");
                return Ok(version);
            }
            Ok(None) => {}
            Err(e) => warn!("Couldn't read cached {stream} release: {e:#}"),
        }

        let version = GodotVersion::parse_with_stream(stream.as_str(), true, &self.feed)
            .await?
            .ok_or_else(|| GobboError::StreamNotAllowed {
                stream: stream.to_string(),
            })?;

        if let Err(e) = self.cache.set(stream, &version) {
            warn!("Couldn't cache {stream} release: {e:#}");
        }
        Ok(version)
    }

    /// Makes sure `version` is installed according to `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::NotInstalled`] in [`InstallMode::Never`] when the
    /// version is missing, or any install error.
    pub async fn ensure_installed(&self, version: &GodotVersion, mode: InstallMode) -> Result<()> {
        let installed = self.installer.is_installed(version)?;
        match (mode, installed) {
            (InstallMode::Never, false) => Err(GobboError::NotInstalled {
                version: version.to_string(),
            }
            .into()),
            (InstallMode::Never | InstallMode::IfAbsent, true) => {
                debug!("Godot {version} already installed");
                Ok(())
            }
            (InstallMode::IfAbsent, false) | (InstallMode::Always, _) => {
                if let Err(e) = self.installer.cleanup_expired_temp() {
                    warn!("Couldn't clean temp files: {e:#}");
                }
                self.installer.install(version).await
            }
        }
    }

    /// Path to execute for an installed `version`.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::NotInstalled`] if the version is missing.
    pub fn launch_path(&self, version: &GodotVersion) -> Result<PathBuf> {
        if !self.installer.is_installed(version)? {
            return Err(GobboError::NotInstalled {
                version: version.to_string(),
            }
            .into());
        }
        let installed = self.installer.installed_path(version);
        Ok(self.installer.store().platform().launch_path(&installed))
    }

    /// Replaces this process with Godot `version`.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::NotInstalled`] if the version is missing.
    /// Otherwise it does not return.
    pub fn run_foreground(&self, version: &GodotVersion, args: &[String]) -> Result<Infallible> {
        let binary = self.launch_path(version)?;
        supervisor::run_foreground(&binary, args)
    }

    /// Starts Godot `version` in the background and waits out its startup.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::NotInstalled`] if the version is missing, or a
    /// launch or early-exit error.
    pub async fn run_supervised(&self, version: &GodotVersion, args: &[String]) -> Result<()> {
        let binary = self.launch_path(version)?;
        supervisor::run_supervised(&binary, args).await
    }
}
