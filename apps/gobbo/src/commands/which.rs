//! Which command for the gobbo CLI.
//!
//! Prints the path of the installed Godot artifact on stdout, for use in
//! scripts: `"$(gobbo which -g 4.2)" --version`.

use anyhow::Result;

use super::{GlobalArgs, open_toolchain, resolve_godot};
use crate::errors::GobboError;

/// Executes the which command.
///
/// # Errors
///
/// Returns [`GobboError::NotInstalled`] if the resolved version is missing.
pub async fn execute(global: &GlobalArgs) -> Result<()> {
    let toolchain = open_toolchain(global)?;
    let version = resolve_godot(&toolchain, global).await?;

    if !toolchain.installer().is_installed(&version)? {
        return Err(GobboError::NotInstalled {
            version: version.to_string(),
        }
        .into());
    }

    println!("{}", toolchain.installer().installed_path(&version).display());
    Ok(())
}
