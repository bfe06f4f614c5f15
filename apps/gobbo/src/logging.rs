//! Log setup for the gobbo CLI.
//!
//! Logs go to stderr so command output on stdout (e.g. `gobbo which`) stays
//! machine-readable. `RUST_LOG`, when set, replaces the `--log-level` filter.

use std::io::IsTerminal;

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

/// Verbosity selected with `--log-level`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
}

impl LogLevel {
    /// Filter directive for this level, keeping HTTP internals quiet.
    #[must_use]
    pub fn to_filter_directive(self) -> String {
        let level = match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        format!("{level},hyper=warn,hyper_util=warn,reqwest=warn")
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init(level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_filter_directive()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .without_time()
        .with_writer(std::io::stderr)
        .try_init();
}
