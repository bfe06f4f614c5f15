//! Error types for gobbo.
//!
//! Most functions propagate `anyhow::Result` with context attached. The
//! variants below are the failures a caller may want to tell apart (via
//! `downcast_ref`), such as a malformed version string versus a transfer
//! failure that is worth retrying.

use std::path::PathBuf;
use thiserror::Error;

/// Consolidated error type for gobbo operations.
#[derive(Debug, Error)]
pub enum GobboError {
    /// The text does not follow the `4.<minor>[.<patch>][-<suffix>][_mono]` grammar.
    #[error("not a Godot version: '{text}'")]
    NotAVersion {
        /// The rejected input.
        text: String,
    },

    /// A stream name ("stable" or "latest") was given where a concrete version is required.
    #[error("stream '{stream}' not allowed here")]
    StreamNotAllowed {
        /// The stream name.
        stream: String,
    },

    /// Minor or patch component does not fit in the version storage bound.
    #[error("version too high: {minor}.{patch}")]
    VersionTooHigh {
        /// Minor component as written.
        minor: String,
        /// Patch component as written.
        patch: String,
    },

    /// No 4.x release was found among the most recent releases of a stream.
    #[error("no recent 4.x releases available for stream '{stream}'")]
    NoRecentRelease {
        /// The stream that was looked up.
        stream: String,
    },

    /// A store file with mandated content has different content on disk.
    #[error("'{}': expected '{expected}', got '{found}'", path.display())]
    SchemaDrift {
        /// The drifted file.
        path: PathBuf,
        /// The mandated content.
        expected: String,
        /// The trimmed content found on disk.
        found: String,
    },

    /// A store entry has the wrong kind (e.g. a file where a directory belongs).
    #[error("invalid store layout: {message}")]
    StoreLayout {
        /// Description of the mismatch.
        message: String,
    },

    /// A download returned an unexpected status or the transport failed.
    #[error("GET {url}: {message}")]
    Transfer {
        /// The requested URL.
        url: String,
        /// Status text or transport error description.
        message: String,
    },

    /// The remote release listing could not be fetched or read.
    #[error("release lookup failed for {url}: {message}")]
    ReleaseFeed {
        /// The listing URL.
        url: String,
        /// Description of the failure.
        message: String,
    },

    /// Linux archives must contain exactly one top-level regular file.
    #[error("expected exactly one regular file in '{}'", dir.display())]
    ExpectedRegularFile {
        /// The extraction directory.
        dir: PathBuf,
    },

    /// macOS archives must contain an application bundle.
    #[error("expected a directory in '{}'", dir.display())]
    ExpectedDirectory {
        /// The extraction directory.
        dir: PathBuf,
    },

    /// Windows archives must contain a normal and a console executable.
    #[error("expected normal and console executables in '{}'", dir.display())]
    ExpectedBothExecutables {
        /// The extraction directory.
        dir: PathBuf,
    },

    /// The requested Godot version is not installed in the store.
    #[error("Godot {version} not installed")]
    NotInstalled {
        /// Short canonical version string.
        version: String,
    },

    /// The Godot binary could not be started.
    #[error("couldn't execute '{}'", binary.display())]
    ProcessLaunch {
        /// The binary that failed to start.
        binary: PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A supervised process exited before its startup window elapsed.
    #[error("process exited too fast with code {code}")]
    ProcessExitedEarly {
        /// Exit code, or -1 when terminated by a signal.
        code: i32,
    },

    /// Filesystem operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O operation that failed.
        message: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl GobboError {
    /// Creates a new `NotAVersion` error.
    #[must_use]
    pub fn not_a_version(text: impl Into<String>) -> Self {
        Self::NotAVersion { text: text.into() }
    }

    /// Creates a new `Transfer` error.
    #[must_use]
    pub fn transfer(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transfer {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ReleaseFeed` error.
    #[must_use]
    pub fn release_feed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ReleaseFeed {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `StoreLayout` error.
    #[must_use]
    pub fn store_layout(message: impl Into<String>) -> Self {
        Self::StoreLayout {
            message: message.into(),
        }
    }

    /// Creates a new `Io` error from an I/O error with context.
    #[must_use]
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Returns the exit code the process should terminate with for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ProcessExitedEarly { code } if *code > 0 => *code,
            _ => 1,
        }
    }
}
