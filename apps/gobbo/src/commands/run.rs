//! Run command for the gobbo CLI.
//!
//! Runs the selected Godot with the given arguments, installing it first
//! unless `--no-install` is set.
//!
//! ```bash
//! gobbo run -g 4.2 -- --headless --script tool.gd
//! gobbo run --background -- path/to/project.godot
//! ```

use anyhow::Result;
use clap::Args;

use super::{GlobalArgs, Launch, launch};

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Start Godot in the background and return once it is up.
    #[clap(short = 'b', long = "background", action = clap::ArgAction::SetTrue)]
    pub background: bool,

    /// Fail instead of installing a missing version.
    #[clap(short = 'n', long = "no-install", action = clap::ArgAction::SetTrue)]
    pub no_install: bool,

    /// Arguments passed to Godot.
    #[clap(last = true)]
    pub args: Vec<String>,
}

/// Executes the run command.
///
/// In the foreground this only returns on error.
///
/// # Errors
///
/// Returns an error if Godot cannot be resolved, installed or launched, or
/// exits during startup in background mode.
pub async fn execute(global: &GlobalArgs, args: RunArgs) -> Result<()> {
    launch(
        global,
        Launch {
            supervised: args.background,
            no_install: args.no_install,
            args: args.args,
        },
    )
    .await
}
