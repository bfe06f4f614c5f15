//! Install command for the gobbo CLI.
//!
//! ## Usage
//!
//! ```bash
//! gobbo install                 # Install the current stable release
//! gobbo install -g 4.2.1        # Install a specific version
//! gobbo install -g latest -e    # Newest build plus its export templates
//! gobbo install -g 4.3 --force  # Reinstall over an existing copy
//! ```

use anyhow::Result;
use clap::Args;

use super::{GlobalArgs, open_toolchain, resolve_godot};
use crate::toolchain::InstallMode;

/// Arguments for the install command.
#[derive(Args)]
pub struct InstallArgs {
    /// Reinstall even if the version is already present.
    #[clap(short = 'f', long = "force", action = clap::ArgAction::SetTrue)]
    pub force: bool,

    /// Also install the export templates for the version.
    #[clap(short = 'e', long = "export-templates", action = clap::ArgAction::SetTrue)]
    pub export_templates: bool,
}

/// Executes the install command.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the version cannot be
/// resolved, or the download or installation fails.
pub async fn execute(global: &GlobalArgs, args: &InstallArgs) -> Result<()> {
    let toolchain = open_toolchain(global)?;
    let version = resolve_godot(&toolchain, global).await?;

    let mode = if args.force {
        InstallMode::Always
    } else {
        InstallMode::IfAbsent
    };
    toolchain.ensure_installed(&version, mode).await?;

    if args.export_templates {
        toolchain
            .installer()
            .install_export_templates(&version)
            .await?;
    }

    println!(
        "Godot {version} installed at {}",
        toolchain.installer().installed_path(&version).display()
    );
    Ok(())
}
