//! Command modules for the gobbo CLI.
//!
//! ## Toolchain Commands
//!
//! - [`install`] - Install a Godot version
//! - [`which`] - Locate an installed version
//! - [`clean`] - Sweep expired scratch files
//!
//! ## Launch Commands
//!
//! - [`run`] - Run Godot with arbitrary arguments
//! - [`edit`] - Open the Godot editor
//!
//! ## Misc
//!
//! - [`version`] - Display version information

pub mod clean;
pub mod edit;
pub mod install;
pub mod run;
pub mod version;
pub mod which;

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;
use tracing::error;

use crate::logging::LogLevel;
use crate::toolchain::{GodotVersion, InstallMode, Settings, Store, Toolchain};

/// Options accepted by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Store directory. Overrides GOBBO_STORE.
    #[clap(long, global = true, value_name = "PATH")]
    pub store: Option<PathBuf>,

    /// Godot version or stream ("stable", "latest"). Defaults to stable.
    #[clap(short = 'g', long, global = true, value_name = "VERSION")]
    pub godot: Option<String>,

    /// Log verbosity.
    #[clap(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
}

/// Opens the store selected by flags and environment.
///
/// Every store problem is logged before failing.
pub fn open_toolchain(global: &GlobalArgs) -> Result<Toolchain> {
    let settings = Settings::from_env(global.store.clone())?;

    match Store::open(&settings.store_root, settings.platform) {
        Ok(store) => Ok(Toolchain::new(store, &settings)),
        Err(errors) => {
            for e in &errors {
                error!("{e}");
            }
            bail!(
                "Store at '{}' is unusable ({} problem(s))",
                settings.store_root.display(),
                errors.len()
            )
        }
    }
}

/// Resolves `--godot`, defaulting to the stable stream.
pub async fn resolve_godot(toolchain: &Toolchain, global: &GlobalArgs) -> Result<GodotVersion> {
    match toolchain
        .resolve_version(global.godot.as_deref(), true, true)
        .await?
    {
        Some(version) => Ok(version),
        None => bail!("No Godot version selected"),
    }
}

/// How a Godot process is started by `run` and `edit`.
pub struct Launch {
    /// Start in the background and watch the startup.
    pub supervised: bool,
    /// Fail instead of installing a missing version.
    pub no_install: bool,
    /// Arguments passed to Godot.
    pub args: Vec<String>,
}

/// Resolves, installs if allowed, and launches Godot.
pub async fn launch(global: &GlobalArgs, request: Launch) -> Result<()> {
    let toolchain = open_toolchain(global)?;
    let version = resolve_godot(&toolchain, global).await?;

    let mode = if request.no_install {
        InstallMode::Never
    } else {
        InstallMode::IfAbsent
    };
    toolchain.ensure_installed(&version, mode).await?;

    if request.supervised {
        toolchain.run_supervised(&version, &request.args).await
    } else {
        match toolchain.run_foreground(&version, &request.args)? {}
    }
}
