//! Godot version identity.
//!
//! A [`GodotVersion`] names one official Godot 4.x build. Its string form is
//! used both as the store key (`4.2.1_mono`) and, in a stricter spelling, in
//! download URLs (`4.2.1-stable`).
//!
//! ## Grammar
//!
//! ```text
//! 4.<minor>[.<patch>][-<suffix>][_mono]
//! ```
//!
//! A suffix of `stable` is the same as no suffix. Any other suffix (`beta1`,
//! `rc2`, ...) marks a pre-release, which is published from a different
//! GitHub repository.

use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use super::Platform;
use super::platform::{Arch, Os};
use super::releases::ReleaseFeed;
use crate::errors::GobboError;

/// Default host serving release downloads.
pub const DEFAULT_DOWNLOAD_HOST: &str = "https://github.com";

const ORG: &str = "godotengine";
const STABLE_REPO: &str = "godot";
const PRERELEASE_REPO: &str = "godot-builds";

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^4\.([0-9]+)(\.([0-9]+))?(-(.+?))?(_mono)?$").expect("version regex is valid")
});

/// Floating version names resolved through the release feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Newest stable release.
    Stable,
    /// Newest release of any kind, pre-releases included.
    Latest,
}

impl Stream {
    /// Returns the stream named by `text`, if it is one.
    #[must_use]
    pub fn from_name(text: &str) -> Option<Self> {
        match text {
            "stable" => Some(Self::Stable),
            "latest" => Some(Self::Latest),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Latest => "latest",
        }
    }

    /// GitHub repository whose releases make up this stream.
    #[must_use]
    pub fn repository(self) -> &'static str {
        match self {
            Self::Stable => STABLE_REPO,
            Self::Latest => PRERELEASE_REPO,
        }
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which archive of a release to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// The editor binary for one platform.
    Editor,
    /// The platform-independent export templates bundle.
    ExportTemplates,
}

/// One official Godot 4.x build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GodotVersion {
    pub minor: u8,
    pub patch: u8,
    /// Empty for stable releases.
    pub suffix: String,
    /// The .NET build variant.
    pub mono: bool,
}

impl GodotVersion {
    /// Parses a concrete version string.
    ///
    /// # Errors
    ///
    /// - [`GobboError::StreamNotAllowed`] for `stable` or `latest`
    /// - [`GobboError::NotAVersion`] if the text does not match the grammar
    /// - [`GobboError::VersionTooHigh`] if minor or patch exceed 255
    pub fn parse(text: &str) -> Result<Self, GobboError> {
        if Stream::from_name(text).is_some() {
            return Err(GobboError::StreamNotAllowed {
                stream: text.to_string(),
            });
        }

        let caps = VERSION_RE
            .captures(text)
            .ok_or_else(|| GobboError::not_a_version(text))?;

        let minor_text = &caps[1];
        let patch_text = caps.get(3).map_or("0", |m| m.as_str());
        let too_high = || GobboError::VersionTooHigh {
            minor: minor_text.to_string(),
            patch: patch_text.to_string(),
        };
        let minor = minor_text.parse::<u8>().map_err(|_| too_high())?;
        let patch = patch_text.parse::<u8>().map_err(|_| too_high())?;

        let suffix = match caps.get(5).map(|m| m.as_str()) {
            None | Some("stable") => String::new(),
            Some(s) => s.to_string(),
        };

        Ok(Self {
            minor,
            patch,
            suffix,
            mono: caps.get(6).is_some(),
        })
    }

    /// Parses a version string that may name a stream.
    ///
    /// Streams are resolved through `feed`. When `allow_stream` is false a
    /// stream yields `Ok(None)`: the caller is already failing for another
    /// reason and resolution would be wasted work.
    ///
    /// # Errors
    ///
    /// Returns parse errors for concrete versions and lookup errors for streams.
    pub async fn parse_with_stream(
        text: &str,
        allow_stream: bool,
        feed: &ReleaseFeed,
    ) -> Result<Option<Self>> {
        match Stream::from_name(text) {
            Some(_) if !allow_stream => Ok(None),
            Some(stream) => feed.current_release(stream).await.map(Some),
            None => Ok(Some(Self::parse(text)?)),
        }
    }

    #[must_use]
    pub fn is_stable(&self) -> bool {
        self.suffix.is_empty()
    }

    /// Renders the version with explicit formatting knobs.
    ///
    /// * `dot` - separate the suffix with `.` instead of `-`
    /// * `stable` - spell out `stable` when there is no suffix
    /// * `mono` - append `_mono` for .NET builds
    #[must_use]
    pub fn to_string_ex(&self, dot: bool, stable: bool, mono: bool) -> String {
        let mut out = format!("4.{}", self.minor);
        if self.patch > 0 {
            out.push_str(&format!(".{}", self.patch));
        }

        let sep = if dot { '.' } else { '-' };
        if !self.suffix.is_empty() {
            out.push(sep);
            out.push_str(&self.suffix);
        } else if stable {
            out.push(sep);
            out.push_str("stable");
        }

        if mono && self.mono {
            out.push_str("_mono");
        }
        out
    }

    /// The strict form used in release tags and download file names.
    #[must_use]
    pub fn release_tag(&self) -> String {
        self.to_string_ex(false, true, false)
    }

    /// Download URL on the default host.
    #[must_use]
    pub fn download_url(&self, platform: Platform, kind: ArtifactKind) -> String {
        self.download_url_on(DEFAULT_DOWNLOAD_HOST, platform, kind)
    }

    /// Download URL on an arbitrary host mirroring GitHub's release paths.
    #[must_use]
    pub fn download_url_on(&self, host: &str, platform: Platform, kind: ArtifactKind) -> String {
        let repo = if self.is_stable() {
            STABLE_REPO
        } else {
            PRERELEASE_REPO
        };
        let tag = self.release_tag();

        let mut url = format!(
            "{}/{ORG}/{repo}/releases/download/{tag}/Godot_v{tag}_",
            host.trim_end_matches('/')
        );
        if self.mono {
            url.push_str("mono_");
        }

        if kind == ArtifactKind::ExportTemplates {
            url.push_str("export_templates.tpz");
            return url;
        }

        match platform.os {
            Os::Windows => {
                url.push_str(match platform.arch {
                    Arch::X86_32 => "win32",
                    Arch::X86_64 => "win64",
                    Arch::Arm32 => "windows_arm32",
                    Arch::Arm64 => "windows_arm64",
                });
                if !self.mono {
                    url.push_str(".exe");
                }
                url.push_str(".zip");
            }
            Os::Linux => {
                url.push_str("linux");
                url.push(if self.mono { '_' } else { '.' });
                url.push_str(match platform.arch {
                    Arch::X86_32 => "x86_32",
                    Arch::X86_64 => "x86_64",
                    Arch::Arm32 => "arm32",
                    Arch::Arm64 => "arm64",
                });
                url.push_str(".zip");
            }
            Os::MacOs => url.push_str("macos.universal.zip"),
        }
        url
    }

    /// Canonical file name of the installed artifact, without extension.
    #[must_use]
    pub fn artifact_name(&self) -> String {
        format!("godot-{self}")
    }

    /// Path of the installed artifact relative to the store's `bin/` tree.
    #[must_use = "returns the path without side effects"]
    pub fn binary_relative_path(&self, platform: Platform) -> PathBuf {
        let name = format!("{}{}", self.artifact_name(), platform.artifact_extension());
        PathBuf::from("official").join(self.to_string()).join(name)
    }
}

impl fmt::Display for GodotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_ex(false, false, true))
    }
}

impl std::str::FromStr for GodotVersion {
    type Err = GobboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
