//! Clean command for the gobbo CLI.

use anyhow::Result;
use tracing::info;

use super::{GlobalArgs, open_toolchain};

/// Executes the clean command.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or its scratch directory
/// cannot be listed.
pub fn execute(global: &GlobalArgs) -> Result<()> {
    let toolchain = open_toolchain(global)?;
    toolchain.installer().cleanup_expired_temp()?;
    info!("Removed expired temp files");
    Ok(())
}
