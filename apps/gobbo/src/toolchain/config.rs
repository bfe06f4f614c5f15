//! Runtime settings resolved from the command line and environment.
//!
//! ## Environment Variables
//!
//! - `GOBBO_STORE`: store root (overridden by `--store`)
//! - `GOBBO_DOWNLOAD_HOST`: host serving release artifacts (default `https://github.com`)
//! - `GOBBO_RELEASES_API`: GitHub API base for release lookups (default `https://api.github.com`)
//!
//! Empty values are treated as unset.

use std::path::PathBuf;

use anyhow::{Context, Result};

use super::Platform;
use super::releases::DEFAULT_RELEASES_API;
use super::version::DEFAULT_DOWNLOAD_HOST;

/// Environment variable overriding the store root.
pub const STORE_ENV: &str = "GOBBO_STORE";

/// Environment variable overriding the artifact download host.
pub const DOWNLOAD_HOST_ENV: &str = "GOBBO_DOWNLOAD_HOST";

/// Environment variable overriding the releases API base.
pub const RELEASES_API_ENV: &str = "GOBBO_RELEASES_API";

/// Directory name of the store under the user data directory.
const STORE_DIR_NAME: &str = "gobbo";

/// Everything an invocation needs to locate its store and remote services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Root of the store.
    pub store_root: PathBuf,
    /// Platform whose artifacts are installed.
    pub platform: Platform,
    /// Host prefix of artifact download URLs, without trailing slash.
    pub download_host: String,
    /// GitHub API base, without trailing slash.
    pub releases_api: String,
}

impl Settings {
    /// Resolves settings from the process environment.
    ///
    /// `store_override` (the `--store` flag) takes precedence over
    /// `GOBBO_STORE`, which takes precedence over the user data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform is unsupported or no store root can
    /// be determined.
    pub fn from_env(store_override: Option<PathBuf>) -> Result<Self> {
        Self::resolve(store_override, Platform::detect()?, |name| {
            std::env::var(name).ok()
        })
    }

    /// Resolves settings with an explicit environment lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if no store root can be determined.
    pub fn resolve<F>(store_override: Option<PathBuf>, platform: Platform, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let store_root = match store_override.or_else(|| var(STORE_ENV).map(PathBuf::from)) {
            Some(root) => root,
            None => dirs::data_dir()
                .map(|d| d.join(STORE_DIR_NAME))
                .context("Cannot determine data directory")?,
        };

        let download_host = var(DOWNLOAD_HOST_ENV)
            .unwrap_or_else(|| DEFAULT_DOWNLOAD_HOST.to_string())
            .trim_end_matches('/')
            .to_string();
        let releases_api = var(RELEASES_API_ENV)
            .unwrap_or_else(|| DEFAULT_RELEASES_API.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            store_root,
            platform,
            download_host,
            releases_api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::platform::{Arch, Os};
    use std::collections::HashMap;

    const LINUX: Platform = Platform::new(Os::Linux, Arch::X86_64);

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let settings = Settings::resolve(None, LINUX, env(&[])).expect("Should resolve");

        assert_eq!(settings.download_host, "https://github.com");
        assert_eq!(settings.releases_api, "https://api.github.com");
        if let Some(data) = dirs::data_dir() {
            assert_eq!(settings.store_root, data.join("gobbo"));
        }
    }

    #[test]
    fn store_flag_beats_environment() {
        let settings = Settings::resolve(
            Some(PathBuf::from("/flag")),
            LINUX,
            env(&[(STORE_ENV, "/env")]),
        )
        .expect("Should resolve");
        assert_eq!(settings.store_root, PathBuf::from("/flag"));
    }

    #[test]
    fn store_environment_used_without_flag() {
        let settings =
            Settings::resolve(None, LINUX, env(&[(STORE_ENV, "/env")])).expect("Should resolve");
        assert_eq!(settings.store_root, PathBuf::from("/env"));
    }

    #[test]
    fn hosts_trim_trailing_slash() {
        let settings = Settings::resolve(
            Some(PathBuf::from("/s")),
            LINUX,
            env(&[
                (DOWNLOAD_HOST_ENV, "http://127.0.0.1:8080/"),
                (RELEASES_API_ENV, "http://127.0.0.1:9090//"),
            ]),
        )
        .expect("Should resolve");
        assert_eq!(settings.download_host, "http://127.0.0.1:8080");
        assert_eq!(settings.releases_api, "http://127.0.0.1:9090");
    }

    #[test]
    fn empty_values_are_unset() {
        let settings = Settings::resolve(
            Some(PathBuf::from("/s")),
            LINUX,
            env(&[(DOWNLOAD_HOST_ENV, ""), (RELEASES_API_ENV, "  ")]),
        )
        .expect("Should resolve");
        assert_eq!(settings.download_host, "https://github.com");
        assert_eq!(settings.releases_api, "https://api.github.com");
    }
}
