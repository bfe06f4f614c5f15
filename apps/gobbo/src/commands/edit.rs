//! Edit command for the gobbo CLI.
//!
//! Opens the Godot editor, by default in the background so the terminal is
//! returned once the editor window is up.

use anyhow::Result;
use clap::Args;

use super::{GlobalArgs, Launch, launch};

/// Godot flag opening the editor.
const EDITOR_FLAG: &str = "-e";

/// Arguments for the edit command.
#[derive(Args)]
pub struct EditArgs {
    /// Keep the editor attached to this terminal.
    #[clap(short = 'f', long = "foreground", action = clap::ArgAction::SetTrue)]
    pub foreground: bool,

    /// Fail instead of installing a missing version.
    #[clap(short = 'n', long = "no-install", action = clap::ArgAction::SetTrue)]
    pub no_install: bool,

    /// Extra arguments passed to Godot after `-e`.
    #[clap(last = true)]
    pub args: Vec<String>,
}

/// Executes the edit command.
///
/// # Errors
///
/// Returns an error if Godot cannot be resolved, installed or launched, or
/// exits during startup in background mode.
pub async fn execute(global: &GlobalArgs, args: EditArgs) -> Result<()> {
    launch(global, editor_launch(args)).await
}

fn editor_launch(args: EditArgs) -> Launch {
    let mut godot_args = Vec::with_capacity(args.args.len() + 1);
    godot_args.push(EDITOR_FLAG.to_string());
    godot_args.extend(args.args);

    Launch {
        supervised: !args.foreground,
        no_install: args.no_install,
        args: godot_args,
    }
}
