//! Per-OS renaming of an extracted editor archive into the store layout.
//!
//! Official archives name their content after the release
//! (`Godot_v4.2.1-stable_linux.x86_64`, `Godot.app`, ...). After
//! normalization the extraction directory holds `godot-<version>` plus the
//! platform's extension, which is what [`GodotVersion::binary_relative_path`]
//! points at.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::platform::{Os, Platform};
use super::version::GodotVersion;
use crate::errors::GobboError;

/// Renames the content of an extracted archive to canonical names.
pub trait Normalizer {
    /// Normalizes `extracted` in place for `version`.
    ///
    /// # Errors
    ///
    /// Returns an archive shape error when the content does not match the
    /// platform's expected layout, or an I/O error if renaming fails.
    fn normalize(&self, extracted: &Path, version: &GodotVersion) -> Result<()>;
}

/// Linux archives hold a single executable.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxNormalizer;

/// macOS archives hold a single `.app` bundle.
#[derive(Debug, Default, Clone, Copy)]
pub struct MacOsNormalizer;

/// Windows archives hold a GUI executable and a `_console.exe` wrapper.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsNormalizer;

/// Returns the normalizer for a platform's archives.
#[must_use]
pub fn normalizer_for(platform: Platform) -> Box<dyn Normalizer + Send + Sync> {
    match platform.os {
        Os::Linux => Box::new(LinuxNormalizer),
        Os::MacOs => Box::new(MacOsNormalizer),
        Os::Windows => Box::new(WindowsNormalizer),
    }
}

impl Normalizer for LinuxNormalizer {
    fn normalize(&self, extracted: &Path, version: &GodotVersion) -> Result<()> {
        let entries = read_entries(extracted)?;
        let [only] = entries.as_slice() else {
            return Err(expected_regular_file(extracted));
        };
        let is_file = std::fs::symlink_metadata(only)
            .with_context(|| format!("Failed to stat {}", only.display()))?
            .is_file();
        if !is_file {
            return Err(expected_regular_file(extracted));
        }

        let target = extracted.join(version.artifact_name());
        rename(only, &target)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&target, std::fs::Permissions::from_mode(0o755))
                .with_context(|| format!("Failed to set permissions: {}", target.display()))?;
        }

        Ok(())
    }
}

impl Normalizer for MacOsNormalizer {
    fn normalize(&self, extracted: &Path, version: &GodotVersion) -> Result<()> {
        let entries = read_entries(extracted)?;
        let Some(bundle) = entries.first() else {
            return Err(GobboError::ExpectedDirectory {
                dir: extracted.to_path_buf(),
            }
            .into());
        };

        let target = extracted.join(format!("{}.app", version.artifact_name()));
        rename(bundle, &target)
    }
}

impl Normalizer for WindowsNormalizer {
    fn normalize(&self, extracted: &Path, version: &GodotVersion) -> Result<()> {
        let entries = read_entries(extracted)?;
        let mut console = None;
        let mut gui = None;

        for entry in &entries {
            let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.ends_with("_console.exe") {
                console = Some(entry);
            } else if name.ends_with(".exe") {
                gui = Some(entry);
            }
        }

        let (Some(gui), Some(console)) = (gui, console) else {
            return Err(GobboError::ExpectedBothExecutables {
                dir: extracted.to_path_buf(),
            }
            .into());
        };

        let name = version.artifact_name();
        rename(gui, &extracted.join(format!("{name}.exe")))?;
        rename(console, &extracted.join(format!("{name}_console.exe")))
    }
}

/// Top-level entries of a directory, sorted by name.
fn read_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}

fn rename(from: &Path, to: &Path) -> Result<()> {
    debug!("Renaming {} to {}", from.display(), to.display());
    std::fs::rename(from, to)
        .with_context(|| format!("Failed to rename {} to {}", from.display(), to.display()))
}

fn expected_regular_file(dir: &Path) -> anyhow::Error {
    GobboError::ExpectedRegularFile {
        dir: dir.to_path_buf(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolchain::platform::Arch;

    fn version(text: &str) -> GodotVersion {
        GodotVersion::parse(text).expect("Should parse")
    }

    fn names(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn linux_renames_single_file() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("Godot_v4.2.1-stable_linux.x86_64"), b"elf").unwrap();

        LinuxNormalizer
            .normalize(temp.path(), &version("4.2.1"))
            .expect("Should normalize");

        assert_eq!(names(temp.path()), vec!["godot-4.2.1"]);
        assert_eq!(std::fs::read(temp.path().join("godot-4.2.1")).unwrap(), b"elf");
    }

    #[cfg(unix)]
    #[test]
    fn linux_marks_binary_executable() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("Should create temp dir");
        let binary = temp.path().join("Godot_v4.3-rc1_linux.x86_64");
        std::fs::write(&binary, b"elf").unwrap();
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o644)).unwrap();

        LinuxNormalizer
            .normalize(temp.path(), &version("4.3-rc1"))
            .expect("Should normalize");

        let mode = std::fs::metadata(temp.path().join("godot-4.3-rc1"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn linux_rejects_empty_archive() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let err = LinuxNormalizer
            .normalize(temp.path(), &version("4.2"))
            .expect_err("Should fail");
        assert!(matches!(
            err.downcast_ref::<GobboError>(),
            Some(GobboError::ExpectedRegularFile { .. })
        ));
    }

    #[test]
    fn linux_rejects_two_files() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("a"), b"a").unwrap();
        std::fs::write(temp.path().join("b"), b"b").unwrap();

        let err = LinuxNormalizer
            .normalize(temp.path(), &version("4.2"))
            .expect_err("Should fail");
        assert!(matches!(
            err.downcast_ref::<GobboError>(),
            Some(GobboError::ExpectedRegularFile { .. })
        ));
        assert_eq!(names(temp.path()), vec!["a", "b"]);
    }

    #[test]
    fn linux_rejects_single_directory() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::create_dir(temp.path().join("Godot_v4.2_mono_linux_x86_64")).unwrap();

        let err = LinuxNormalizer
            .normalize(temp.path(), &version("4.2_mono"))
            .expect_err("Should fail");
        assert!(matches!(
            err.downcast_ref::<GobboError>(),
            Some(GobboError::ExpectedRegularFile { .. })
        ));
    }

    #[test]
    fn macos_renames_bundle() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let macos_dir = temp.path().join("Godot.app").join("Contents").join("MacOS");
        std::fs::create_dir_all(&macos_dir).unwrap();
        std::fs::write(macos_dir.join("Godot"), b"macho").unwrap();

        MacOsNormalizer
            .normalize(temp.path(), &version("4.2.1"))
            .expect("Should normalize");

        assert_eq!(names(temp.path()), vec!["godot-4.2.1.app"]);
        assert!(
            temp.path()
                .join("godot-4.2.1.app/Contents/MacOS/Godot")
                .is_file()
        );
    }

    #[test]
    fn macos_rejects_empty_archive() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let err = MacOsNormalizer
            .normalize(temp.path(), &version("4.2"))
            .expect_err("Should fail");
        assert!(matches!(
            err.downcast_ref::<GobboError>(),
            Some(GobboError::ExpectedDirectory { .. })
        ));
    }

    #[test]
    fn windows_renames_both_executables() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("Godot_v4.2.1-stable_win64.exe"), b"gui").unwrap();
        std::fs::write(
            temp.path().join("Godot_v4.2.1-stable_win64_console.exe"),
            b"console",
        )
        .unwrap();

        WindowsNormalizer
            .normalize(temp.path(), &version("4.2.1"))
            .expect("Should normalize");

        assert_eq!(
            names(temp.path()),
            vec!["godot-4.2.1.exe", "godot-4.2.1_console.exe"]
        );
        assert_eq!(
            std::fs::read(temp.path().join("godot-4.2.1_console.exe")).unwrap(),
            b"console"
        );
    }

    #[test]
    fn windows_requires_console_executable() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("Godot_v4.2.1-stable_win64.exe"), b"gui").unwrap();

        let err = WindowsNormalizer
            .normalize(temp.path(), &version("4.2.1"))
            .expect_err("Should fail");
        assert!(matches!(
            err.downcast_ref::<GobboError>(),
            Some(GobboError::ExpectedBothExecutables { .. })
        ));
    }

    #[test]
    fn normalizer_for_matches_os() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        std::fs::write(temp.path().join("Godot_v4.2_linux.arm64"), b"elf").unwrap();

        normalizer_for(Platform::new(Os::Linux, Arch::Arm64))
            .normalize(temp.path(), &version("4.2"))
            .expect("Should normalize");

        assert_eq!(names(temp.path()), vec!["godot-4.2"]);
    }
}
