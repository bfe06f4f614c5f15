//! Version command for the gobbo CLI.
//!
//! In verbose mode, also shows the git commit, platform and store location.

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;
use crate::toolchain::Settings;

/// Arguments for the version command.
#[derive(Args)]
pub struct VersionArgs {
    /// Show commit, platform and store location.
    #[clap(short = 'v', long = "verbose", action = clap::ArgAction::SetTrue)]
    pub verbose: bool,
}

/// Executes the version command.
#[allow(clippy::unnecessary_wraps)]
pub fn execute(global: &GlobalArgs, args: &VersionArgs) -> Result<()> {
    println!("gobbo {}", env!("CARGO_PKG_VERSION"));
    if args.verbose {
        println!();
        println!("Build Information:");
        println!("  Version:  {}", env!("CARGO_PKG_VERSION"));
        println!("  Commit:   {}", git_commit());
        println!("  Platform: {}", platform_string());
        println!("  Store:    {}", store_string(global));
    }
    Ok(())
}

/// Returns the git commit hash from environment or a fallback.
fn git_commit() -> &'static str {
    option_env!("GOBBO_GIT_COMMIT").unwrap_or("unknown")
}

/// Returns a human-readable platform string.
fn platform_string() -> String {
    format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH)
}

fn store_string(global: &GlobalArgs) -> String {
    Settings::from_env(global.store.clone()).map_or_else(
        |e| format!("unavailable ({e})"),
        |settings| settings.store_root.display().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;

    fn global() -> GlobalArgs {
        GlobalArgs {
            store: Some("/tmp/gobbo-store".into()),
            godot: None,
            log_level: LogLevel::Info,
        }
    }

    #[test]
    fn execute_with_verbose_false_succeeds() {
        assert!(execute(&global(), &VersionArgs { verbose: false }).is_ok());
    }

    #[test]
    fn execute_with_verbose_true_succeeds() {
        assert!(execute(&global(), &VersionArgs { verbose: true }).is_ok());
    }

    #[test]
    fn platform_string_is_not_empty() {
        let platform = platform_string();
        assert!(!platform.is_empty());
        assert!(platform.contains('-'));
    }

    #[test]
    fn git_commit_returns_value() {
        assert!(!git_commit().is_empty());
    }
}
