//! Launching installed Godot binaries.
//!
//! Foreground runs hand the terminal over to Godot. Supervised runs start
//! Godot in the background and watch it for a short runway: an editor that
//! dies during startup (bad project path, missing GPU driver, ...) is
//! reported with its captured output instead of vanishing silently.

use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error};

use crate::errors::GobboError;

/// How long a supervised process must survive to count as started.
pub const RUNWAY: Duration = Duration::from_secs(2);

/// Replaces the current process with `binary`.
///
/// The environment is inherited. If the exec itself fails the error is
/// logged and the process exits with status 1.
#[cfg(unix)]
pub fn run_foreground(binary: &Path, args: &[String]) -> ! {
    use std::os::unix::process::CommandExt;

    debug!("Exec {} {args:?}", binary.display());
    let err = std::process::Command::new(binary).args(args).exec();
    error!("Couldn't execute '{}': {err}", binary.display());
    std::process::exit(1);
}

/// Runs `binary` to completion and exits with its exit code.
#[cfg(not(unix))]
pub fn run_foreground(binary: &Path, args: &[String]) -> ! {
    debug!("Running {} {args:?}", binary.display());
    match std::process::Command::new(binary).args(args).status() {
        Ok(status) => std::process::exit(status.code().unwrap_or(1)),
        Err(err) => {
            error!("Couldn't execute '{}': {err}", binary.display());
            std::process::exit(1);
        }
    }
}

/// Starts `binary` in the background and waits out the [`RUNWAY`].
///
/// # Errors
///
/// Returns [`GobboError::ProcessLaunch`] if the process cannot be spawned
/// and [`GobboError::ProcessExitedEarly`] if it exits within the runway. In
/// the latter case its captured stdout and stderr are replayed first.
pub async fn run_supervised(binary: &Path, args: &[String]) -> Result<()> {
    run_supervised_for(binary, args, RUNWAY).await
}

/// [`run_supervised`] with an explicit runway.
///
/// # Errors
///
/// See [`run_supervised`].
pub async fn run_supervised_for(binary: &Path, args: &[String], runway: Duration) -> Result<()> {
    let mut stdout = tempfile::tempfile().context("Failed to create temp file for stdout")?;
    let mut stderr = tempfile::tempfile().context("Failed to create temp file for stderr")?;

    debug!("Spawning {} {args:?}", binary.display());
    let mut child = tokio::process::Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(stdout.try_clone().context("Failed to clone stdout handle")?)
        .stderr(stderr.try_clone().context("Failed to clone stderr handle")?)
        .spawn()
        .map_err(|source| GobboError::ProcessLaunch {
            binary: binary.to_path_buf(),
            source,
        })?;

    let pid = child.id();

    // Dropping a tokio child without kill_on_drop leaves the process running.
    tokio::select! {
        () = tokio::time::sleep(runway) => {
            debug!("Process {pid:?} survived {runway:?}; detaching");
            Ok(())
        }
        status = child.wait() => {
            let status = status.context("Failed to wait for process")?;
            debug!("Process exited early: {status}");

            replay(&mut stdout, &mut std::io::stdout()).context("Failed to replay stdout")?;
            replay(&mut stderr, &mut std::io::stderr()).context("Failed to replay stderr")?;

            Err(GobboError::ProcessExitedEarly {
                code: status.code().unwrap_or(-1),
            }
            .into())
        }
    }
}

fn replay(captured: &mut std::fs::File, out: &mut impl std::io::Write) -> std::io::Result<()> {
    captured.seek(SeekFrom::Start(0))?;
    std::io::copy(captured, out)?;
    out.flush()
}
