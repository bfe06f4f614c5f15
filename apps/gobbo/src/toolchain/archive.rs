//! Zip extraction for downloaded Godot artifacts.
//!
//! Entries are extracted as-is. Nothing is stripped, since a macOS archive's
//! single root entry is the `.app` bundle itself.

use std::io::Read;
use std::path::{Component, Path};

use anyhow::{Context, Result, bail};

/// Extracts a ZIP archive to the destination directory.
///
/// Creates the destination directory if it does not exist. Unix permission
/// bits stored in the archive are restored, and symlink entries are
/// recreated as symlinks on Unix.
///
/// # Errors
///
/// Returns an error if:
/// - The archive cannot be opened
/// - The archive is not a valid ZIP file
/// - An entry escapes the destination directory, directly or through a
///   symlink
/// - Directory or file creation fails
pub fn extract_zip(archive_path: &Path, dest_dir: &Path) -> Result<()> {
    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;

    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Failed to read ZIP archive: {}", archive_path.display()))?;

    std::fs::create_dir_all(dest_dir)
        .with_context(|| format!("Failed to create directory: {}", dest_dir.display()))?;

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .with_context(|| format!("Failed to read archive entry {i}"))?;

        let entry_path = entry
            .enclosed_name()
            .with_context(|| format!("Invalid entry path in archive: entry {i}"))?;

        if entry_path.is_absolute()
            || entry_path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            bail!(
                "Refusing to extract path with parent directory or absolute reference: {}",
                entry_path.display()
            );
        }

        ensure_no_symlink_on_path(dest_dir, &entry_path)?;
        let output_path = dest_dir.join(&entry_path);

        if entry.is_dir() {
            std::fs::create_dir_all(&output_path).with_context(|| {
                format!("Failed to create directory: {}", output_path.display())
            })?;
            continue;
        }

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        if entry.is_symlink() {
            let mut target = String::new();
            entry
                .read_to_string(&mut target)
                .with_context(|| format!("Failed to read link target: {}", entry_path.display()))?;
            if !link_stays_inside(&entry_path, Path::new(&target)) {
                bail!(
                    "Refusing to create symlink leaving the archive: {} -> {target}",
                    entry_path.display()
                );
            }
            create_symlink(&target, &output_path)?;
            continue;
        }

        let mut outfile = std::fs::File::create(&output_path)
            .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

        std::io::copy(&mut entry, &mut outfile)
            .with_context(|| format!("Failed to extract: {}", output_path.display()))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&output_path, std::fs::Permissions::from_mode(mode & 0o777))
                .with_context(|| format!("Failed to set permissions: {}", output_path.display()))?;
        }
    }

    Ok(())
}

/// Fails if `entry_path`, or any existing directory above it, is a symlink
/// inside `dest_dir`. Writing through one could land outside `dest_dir`.
fn ensure_no_symlink_on_path(dest_dir: &Path, entry_path: &Path) -> Result<()> {
    let mut current = dest_dir.to_path_buf();
    for component in entry_path.components() {
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => bail!(
                "Refusing to extract through symlink: {}",
                entry_path.display()
            ),
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => break,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to inspect: {}", current.display()));
            }
        }
    }
    Ok(())
}

/// Whether a link at `entry_path` pointing to `target` resolves inside the
/// extraction root.
fn link_stays_inside(entry_path: &Path, target: &Path) -> bool {
    let mut depth = entry_path
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
        .saturating_sub(1);

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => match depth.checked_sub(1) {
                Some(up) => depth = up,
                None => return false,
            },
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

#[cfg(unix)]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::os::unix::fs::symlink(target, link)
        .with_context(|| format!("Failed to create symlink: {}", link.display()))
}

#[cfg(not(unix))]
fn create_symlink(target: &str, link: &Path) -> Result<()> {
    std::fs::write(link, target)
        .with_context(|| format!("Failed to create file: {}", link.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn write_zip(archive_path: &Path, entries: &[(&str, &[u8])]) {
        let file = std::fs::File::create(archive_path).expect("Should create file");
        let mut zip = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();
        for (name, content) in entries {
            zip.start_file(*name, options).expect("Should start file");
            zip.write_all(content).expect("Should write");
        }
        zip.finish().expect("Should finish");
    }

    #[test]
    fn extract_zip_keeps_root_folder() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("test.zip");
        let dest_dir = temp.path().join("output");

        write_zip(
            &archive_path,
            &[
                ("Godot.app/Contents/Info.plist", b"plist"),
                ("Godot.app/Contents/MacOS/Godot", b"binary"),
            ],
        );

        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        assert_eq!(
            std::fs::read(dest_dir.join("Godot.app/Contents/MacOS/Godot")).unwrap(),
            b"binary"
        );
        assert!(dest_dir.join("Godot.app/Contents/Info.plist").is_file());
    }

    #[test]
    fn extract_zip_flat_single_file() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("test.zip");
        let dest_dir = temp.path().join("output");

        write_zip(&archive_path, &[("Godot_v4.2.1-stable_linux.x86_64", b"elf")]);

        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        let names: Vec<_> = std::fs::read_dir(&dest_dir)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["Godot_v4.2.1-stable_linux.x86_64"]);
    }

    #[test]
    fn extract_zip_empty_archive() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("empty.zip");
        let dest_dir = temp.path().join("output");

        write_zip(&archive_path, &[]);

        extract_zip(&archive_path, &dest_dir).expect("Should extract");
        assert!(dest_dir.is_dir());
        assert_eq!(std::fs::read_dir(&dest_dir).unwrap().count(), 0);
    }

    #[test]
    fn extract_zip_rejects_non_zip_file() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("bogus.zip");
        std::fs::write(&archive_path, b"<html>not found</html>").unwrap();

        assert!(extract_zip(&archive_path, &temp.path().join("output")).is_err());
    }

    #[test]
    fn extract_zip_rejects_path_traversal() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("evil.zip");
        write_zip(&archive_path, &[("../escape", b"x")]);

        assert!(extract_zip(&archive_path, &temp.path().join("output")).is_err());
        assert!(!temp.path().join("escape").exists());
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_rejects_symlink_leaving_destination() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("evil.zip");
        let dest_dir = temp.path().join("output");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            zip.add_symlink("link", "../outside", options)
                .expect("Should add symlink");
            zip.start_file("link/planted", options)
                .expect("Should start file");
            zip.write_all(b"x").expect("Should write");
            zip.finish().expect("Should finish");
        }
        std::fs::create_dir_all(temp.path().join("outside")).unwrap();

        assert!(extract_zip(&archive_path, &dest_dir).is_err());
        assert!(!temp.path().join("outside/planted").exists());
        assert!(dest_dir.join("link").symlink_metadata().is_err());
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_refuses_writing_through_symlink() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("alias.zip");
        let dest_dir = temp.path().join("output");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            zip.start_file("sub/real", options).expect("Should start file");
            zip.write_all(b"data").expect("Should write");
            zip.add_symlink("alias", "sub", options)
                .expect("Should add symlink");
            zip.start_file("alias/planted", options)
                .expect("Should start file");
            zip.write_all(b"x").expect("Should write");
            zip.finish().expect("Should finish");
        }

        assert!(extract_zip(&archive_path, &dest_dir).is_err());
        assert!(!dest_dir.join("sub/planted").exists());
    }

    #[test]
    fn link_targets_are_checked_against_root() {
        assert!(link_stays_inside(Path::new("a/b/link"), Path::new("../c")));
        assert!(link_stays_inside(Path::new("a/link"), Path::new("./../x")));
        assert!(!link_stays_inside(Path::new("link"), Path::new("../outside")));
        assert!(!link_stays_inside(Path::new("a/link"), Path::new("b/../../..")));
        assert!(!link_stays_inside(Path::new("link"), Path::new("/etc/passwd")));
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_restores_unix_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("mode.zip");
        let dest_dir = temp.path().join("output");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default().unix_permissions(0o755);
            zip.start_file("godot", options).expect("Should start file");
            zip.write_all(b"elf").expect("Should write");
            zip.finish().expect("Should finish");
        }

        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        let mode = std::fs::metadata(dest_dir.join("godot"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn extract_zip_recreates_relative_symlinks() {
        let temp = tempfile::tempdir().expect("Should create temp dir");
        let archive_path = temp.path().join("link.zip");
        let dest_dir = temp.path().join("output");
        {
            let file = std::fs::File::create(&archive_path).expect("Should create file");
            let mut zip = zip::ZipWriter::new(file);
            let options = SimpleFileOptions::default();
            zip.start_file("Current/real", options)
                .expect("Should start file");
            zip.write_all(b"data").expect("Should write");
            zip.add_symlink("Current/alias", "real", options)
                .expect("Should add symlink");
            zip.finish().expect("Should finish");
        }

        extract_zip(&archive_path, &dest_dir).expect("Should extract");

        let link = dest_dir.join("Current/alias");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read(&link).unwrap(), b"data");
    }
}
