//! Current-release lookup against the GitHub releases API.
//!
//! Godot publishes stable releases in `godotengine/godot` and every build,
//! pre-releases included, in `godotengine/godot-builds`. The newest 4.x
//! release of a [`Stream`] is found by listing the most recent releases of
//! its repository, newest first, and taking the first whose name starts with
//! the major version.
//!
//! The API base can be overridden with the `GOBBO_RELEASES_API` environment
//! variable (see [`super::config`]) for testing or mirrors.

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, error, info};

use super::version::{GodotVersion, Stream};
use crate::errors::GobboError;

/// Default GitHub API base URL.
pub const DEFAULT_RELEASES_API: &str = "https://api.github.com";

/// How many of the newest releases are scanned for a 4.x entry.
const RELEASE_WINDOW: usize = 5;

/// Request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User-Agent header for HTTP requests. GitHub rejects requests without one.
const USER_AGENT: &str = "gobbo-toolchain-manager";

/// The subset of a GitHub release entry that is read.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ReleaseEntry {
    /// Display name, e.g. `4.2.1-stable`. GitHub allows it to be null.
    pub name: Option<String>,
}

/// Client for the remote release listing.
#[derive(Debug, Clone)]
pub struct ReleaseFeed {
    api_base: String,
}

impl ReleaseFeed {
    #[must_use]
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL listing the newest releases of a stream's repository.
    #[must_use]
    pub fn releases_url(&self, stream: Stream) -> String {
        format!(
            "{}/repos/godotengine/{}/releases?per_page={RELEASE_WINDOW}",
            self.api_base,
            stream.repository()
        )
    }

    /// Resolves a stream to the newest 4.x release.
    ///
    /// # Errors
    ///
    /// Returns [`GobboError::ReleaseFeed`] if the listing cannot be fetched,
    /// [`GobboError::NoRecentRelease`] if no 4.x release is in the window, or a
    /// parse error if a 4.x release has a malformed name.
    pub async fn current_release(&self, stream: Stream) -> Result<GodotVersion> {
        info!("Checking {stream} Godot release...");
        let releases = self.fetch_releases(stream).await?;
        let version = pick_current(&releases, stream)?;
        info!("=> {version}");
        Ok(version)
    }

    async fn fetch_releases(&self, stream: Stream) -> Result<Vec<ReleaseEntry>> {
        let url = self.releases_url(stream);
        debug!("Fetching releases from {url}");

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        let response = client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| {
                error!("Couldn't fetch releases from {url}: {e}");
                GobboError::release_feed(&url, e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GobboError::release_feed(&url, format!("HTTP {status}")).into());
        }

        let text = response
            .text()
            .await
            .map_err(|e| GobboError::release_feed(&url, e.to_string()))?;

        serde_json::from_str(&text)
            .map_err(|e| GobboError::release_feed(&url, format!("invalid JSON: {e}")).into())
    }
}

/// Picks the first 4.x release among the newest entries.
fn pick_current(releases: &[ReleaseEntry], stream: Stream) -> Result<GodotVersion> {
    for (i, release) in releases.iter().take(RELEASE_WINDOW).enumerate() {
        let Some(name) = release.name.as_deref() else {
            debug!("Release {i} has no name - skipping.");
            continue;
        };
        debug!("Release {i} is: '{name}'");

        if !name.starts_with('4') {
            debug!("Release's major version isn't 4 - skipping.");
            continue;
        }

        return GodotVersion::parse(name)
            .with_context(|| format!("Couldn't parse release '{name}'"));
    }

    Err(GobboError::NoRecentRelease {
        stream: stream.to_string(),
    }
    .into())
}
