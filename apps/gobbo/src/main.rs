#![warn(clippy::pedantic)]

//! # gobbo
//!
//! Installs official Godot 4.x builds into a local store and launches them.
//!
//! ## Subcommands
//!
//! - `install` - Download and install a Godot version
//! - `run` - Run Godot, installing it first if needed
//! - `edit` - Open the Godot editor (`godot -e`)
//! - `which` - Print the path of an installed Godot binary
//! - `clean` - Remove expired downloads from the store
//! - `version` - Display version information
//!
//! ## Choosing a Version
//!
//! `--godot` accepts a concrete version (`4.2.1`, `4.3-rc1_mono`) or a stream
//! name: `stable` for the newest stable release, `latest` for the newest
//! build including pre-releases. Without `--godot`, `stable` is used.
//!
//! ## Examples
//!
//! ```bash
//! gobbo install -g 4.2.1
//! gobbo edit -g latest
//! gobbo run -- --headless --script tool.gd
//! ```

mod commands;
mod errors;
mod logging;
mod toolchain;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{GlobalArgs, clean, edit, install, run, version, which};
use errors::GobboError;

/// Godot toolchain manager.
#[derive(Parser)]
#[command(
    name = "gobbo",
    author,
    version,
    about = "Install and launch official Godot builds",
    after_help = "\
VERSIONS:
    4.<minor>[.<patch>][-<suffix>][_mono]   e.g. 4.2.1, 4.3-rc1, 4.2_mono
    stable                                  newest stable release
    latest                                  newest release including pre-releases

ENVIRONMENT VARIABLES:
    GOBBO_STORE             Store directory (default: <data dir>/gobbo)
    GOBBO_DOWNLOAD_HOST     Artifact host (default: https://github.com)
    GOBBO_RELEASES_API      Release API base (default: https://api.github.com)
    RUST_LOG                Log filter, overrides --log-level"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the gobbo CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// Install a Godot version.
    ///
    /// Does nothing if the version is already installed, unless --force is given.
    Install(install::InstallArgs),

    /// Run Godot.
    ///
    /// Arguments after `--` are passed to Godot. By default Godot replaces
    /// this process; with --background it is started and watched for a
    /// couple of seconds instead.
    Run(run::RunArgs),

    /// Open the Godot editor.
    ///
    /// Like `run`, but passes `-e` and starts the editor in the background
    /// unless --foreground is given.
    Edit(edit::EditArgs),

    /// Print the path of an installed Godot binary.
    Which,

    /// Remove downloads and scratch files older than 31 days.
    Clean,

    /// Display version information.
    Version(version::VersionArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let exit_code = handle_error(&e);
        std::process::exit(exit_code);
    }
}

/// Prints an error and returns the exit code for it.
///
/// A supervised Godot that exited early keeps its own exit code so scripts
/// can tell why it failed.
fn handle_error(e: &anyhow::Error) -> i32 {
    eprintln!("Error: {e:?}");
    e.downcast_ref::<GobboError>()
        .map_or(1, GobboError::exit_code)
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.global.log_level);

    match cli.command {
        Commands::Install(args) => install::execute(&cli.global, &args).await,
        Commands::Run(args) => run::execute(&cli.global, args).await,
        Commands::Edit(args) => edit::execute(&cli.global, args).await,
        Commands::Which => which::execute(&cli.global).await,
        Commands::Clean => clean::execute(&cli.global),
        Commands::Version(args) => version::execute(&cli.global, &args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_args_are_passed_through() {
        let cli = Cli::try_parse_from(["gobbo", "run", "-g", "4.2", "--", "--headless", "-s", "x.gd"])
            .expect("Should parse");
        assert_eq!(cli.global.godot.as_deref(), Some("4.2"));
        match cli.command {
            Commands::Run(args) => assert_eq!(args.args, ["--headless", "-s", "x.gd"]),
            _ => panic!("Expected run"),
        }
    }

    #[test]
    fn global_options_work_after_subcommand() {
        let cli = Cli::try_parse_from(["gobbo", "which", "--store", "/tmp/s", "--log-level", "debug"])
            .expect("Should parse");
        assert_eq!(cli.global.store.as_deref(), Some(std::path::Path::new("/tmp/s")));
        assert_eq!(cli.global.log_level, logging::LogLevel::Debug);
    }

    #[test]
    fn handle_error_uses_early_exit_code() {
        let err: anyhow::Error = GobboError::ProcessExitedEarly { code: 3 }.into();
        assert_eq!(handle_error(&err), 3);

        let err = anyhow::anyhow!("plain failure");
        assert_eq!(handle_error(&err), 1);
    }
}
