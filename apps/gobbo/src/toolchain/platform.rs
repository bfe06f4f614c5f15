//! Platform detection for Godot downloads.
//!
//! The platform is detected once per process from the compile target and
//! then passed around by value. It selects the download URL token, the
//! installed binary's extension and the archive normalizer.

use anyhow::{Result, bail};
use std::fmt;
use std::path::{Path, PathBuf};

/// Operating systems Godot publishes editor builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

/// CPU architectures Godot publishes editor builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X86_32,
    X86_64,
    Arm32,
    Arm64,
}

/// An OS and architecture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Platform {
    pub os: Os,
    pub arch: Arch,
}

impl Platform {
    #[must_use]
    pub const fn new(os: Os, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detects the current platform based on compile-time configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the current OS or architecture has no Godot builds.
    pub fn detect() -> Result<Self> {
        let os = match std::env::consts::OS {
            "linux" => Os::Linux,
            "macos" => Os::MacOs,
            "windows" => Os::Windows,
            other => bail!("Unsupported OS: {other}. Supported: linux, macos, windows"),
        };

        let arch = match std::env::consts::ARCH {
            "x86" => Arch::X86_32,
            "x86_64" => Arch::X86_64,
            "arm" => Arch::Arm32,
            "aarch64" => Arch::Arm64,
            other => bail!(
                "Unsupported architecture: {other}. Supported: x86, x86_64, arm, aarch64"
            ),
        };

        Ok(Self { os, arch })
    }

    /// Returns the file extension of the installed Godot artifact.
    ///
    /// macOS installs an application bundle, Windows an executable, Linux a
    /// bare binary.
    #[must_use = "returns the extension string without side effects"]
    pub fn artifact_extension(self) -> &'static str {
        match self.os {
            Os::Linux => "",
            Os::MacOs => ".app",
            Os::Windows => ".exe",
        }
    }

    /// Returns the path that must be executed to start an installed artifact.
    ///
    /// On macOS the installed artifact is a bundle directory; the executable
    /// lives inside it.
    #[must_use = "returns the path without side effects"]
    pub fn launch_path(self, installed: &Path) -> PathBuf {
        match self.os {
            Os::MacOs => installed.join("Contents").join("MacOS").join("Godot"),
            Os::Linux | Os::Windows => installed.to_path_buf(),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Linux => "linux",
            Self::MacOs => "macos",
            Self::Windows => "windows",
        })
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X86_32 => "x86_32",
            Self::X86_64 => "x86_64",
            Self::Arm32 => "arm32",
            Self::Arm64 => "arm64",
        })
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.os, self.arch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_extension_correct_for_each_os() {
        assert_eq!(Platform::new(Os::Linux, Arch::X86_64).artifact_extension(), "");
        assert_eq!(Platform::new(Os::MacOs, Arch::Arm64).artifact_extension(), ".app");
        assert_eq!(
            Platform::new(Os::Windows, Arch::X86_64).artifact_extension(),
            ".exe"
        );
    }

    #[test]
    fn display_joins_os_and_arch() {
        assert_eq!(Platform::new(Os::Linux, Arch::X86_64).to_string(), "linux-x86_64");
        assert_eq!(Platform::new(Os::Windows, Arch::X86_32).to_string(), "windows-x86_32");
        assert_eq!(Platform::new(Os::MacOs, Arch::Arm64).to_string(), "macos-arm64");
    }

    #[test]
    fn launch_path_enters_macos_bundle() {
        let installed = Path::new("/store/bin/official/4.2/godot-4.2.app");
        assert_eq!(
            Platform::new(Os::MacOs, Arch::Arm64).launch_path(installed),
            installed.join("Contents/MacOS/Godot")
        );
        assert_eq!(
            Platform::new(Os::Linux, Arch::X86_64).launch_path(installed),
            installed
        );
    }

    #[test]
    fn detect_returns_platform_on_supported_system() {
        let result = Platform::detect();

        #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
        assert!(matches!(
            result,
            Ok(Platform {
                os: Os::Linux,
                arch: Arch::X86_64
            })
        ));

        #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
        assert!(matches!(
            result,
            Ok(Platform {
                os: Os::MacOs,
                arch: Arch::Arm64
            })
        ));

        #[cfg(all(target_os = "windows", target_arch = "x86_64"))]
        assert!(matches!(
            result,
            Ok(Platform {
                os: Os::Windows,
                arch: Arch::X86_64
            })
        ));

        let _ = result;
    }
}
