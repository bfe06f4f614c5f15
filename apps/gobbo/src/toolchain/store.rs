//! The gobbo store: an on-disk root with a fixed schema.
//!
//! ## Directory Structure
//!
//! ```text
//! <root>/                   # GOBBO_STORE, --store or the user data dir
//!   version                 # Store schema marker, must contain "1"
//!   cache/                  # One file per stream name ("stable", "latest")
//!   bin/
//!     official/
//!       4.2.1/              # One directory per installed version
//!         godot-4.2.1       # Normalized binary (.app / .exe elsewhere)
//!   tmp/                    # Downloads and extraction scratch space
//! ```
//!
//! Opening a store walks the whole schema, creating what is missing and
//! reporting every mismatch at once. A store is only handed out when the
//! walk produced no errors.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::Platform;
use crate::errors::GobboError;

/// One node of the store schema.
#[derive(Debug, Clone, Copy)]
pub enum SchemaNode {
    /// A directory with the listed children.
    Dir(&'static [(&'static str, SchemaNode)]),
    /// A file that must exist, optionally with exactly this content.
    File(Option<&'static str>),
}

/// Schema version written to and checked against the `version` file.
pub const SCHEMA_VERSION: &str = "1";

/// Stream cache directory name.
pub const CACHE_DIR: &str = "cache";
/// Installed artifacts directory name.
pub const BIN_DIR: &str = "bin";
/// Scratch directory name.
pub const TMP_DIR: &str = "tmp";

/// The store schema, walked on every open.
pub const SCHEMA: SchemaNode = SchemaNode::Dir(&[
    ("version", SchemaNode::File(Some(SCHEMA_VERSION))),
    (CACHE_DIR, SchemaNode::Dir(&[])),
    (BIN_DIR, SchemaNode::Dir(&[("official", SchemaNode::Dir(&[]))])),
    (TMP_DIR, SchemaNode::Dir(&[])),
]);

/// An opened, schema-checked store.
#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    platform: Platform,
}

impl Store {
    /// Opens the store at `root`, creating it and any missing schema entries.
    ///
    /// # Errors
    ///
    /// Returns every problem found during the walk: I/O failures, entries of
    /// the wrong kind and [`GobboError::SchemaDrift`] for mandated files with
    /// different content.
    pub fn open(root: impl Into<PathBuf>, platform: Platform) -> Result<Self, Vec<GobboError>> {
        let root = root.into();
        debug!("Opening store at {}", root.display());

        let errors = walk(SCHEMA, &root);
        if errors.is_empty() {
            Ok(Self { root, platform })
        } else {
            Err(errors)
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Joins path segments onto the store root.
    #[must_use = "returns the path without side effects"]
    pub fn join<I, S>(&self, segments: I) -> PathBuf
    where
        I: IntoIterator<Item = S>,
        S: AsRef<Path>,
    {
        segments
            .into_iter()
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    #[must_use = "returns the path without side effects"]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(CACHE_DIR)
    }

    #[must_use = "returns the path without side effects"]
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join(BIN_DIR)
    }

    #[must_use = "returns the path without side effects"]
    pub fn tmp_dir(&self) -> PathBuf {
        self.root.join(TMP_DIR)
    }
}

fn walk(node: SchemaNode, path: &Path) -> Vec<GobboError> {
    match node {
        SchemaNode::Dir(children) => walk_dir(children, path),
        SchemaNode::File(content) => check_file(content, path).into_iter().collect(),
    }
}

fn walk_dir(children: &[(&str, SchemaNode)], path: &Path) -> Vec<GobboError> {
    match std::fs::metadata(path) {
        Ok(meta) if !meta.is_dir() => {
            return vec![GobboError::store_layout(format!(
                "'{}' should be a directory",
                path.display()
            ))];
        }
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if let Err(e) = std::fs::create_dir_all(path) {
                return vec![GobboError::io(
                    format!("Failed to create directory: {}", path.display()),
                    e,
                )];
            }
        }
        Err(e) => {
            return vec![GobboError::io(
                format!("Failed to stat {}", path.display()),
                e,
            )];
        }
    }

    children
        .iter()
        .flat_map(|(name, child)| walk(*child, &path.join(name)))
        .collect()
}

fn check_file(content: Option<&str>, path: &Path) -> Option<GobboError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Some(GobboError::store_layout(format!(
            "expected file '{}', got directory",
            path.display()
        ))),
        Ok(_) => {
            let expected = content?;
            match std::fs::read_to_string(path) {
                Ok(found) if found.trim() == expected.trim() => None,
                Ok(found) => Some(GobboError::SchemaDrift {
                    path: path.to_path_buf(),
                    expected: expected.to_string(),
                    found: found.trim().to_string(),
                }),
                Err(e) => Some(GobboError::io(
                    format!("Failed to read {}", path.display()),
                    e,
                )),
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let body = content.map(|c| format!("{c}\n")).unwrap_or_default();
            std::fs::write(path, body)
                .err()
                .map(|e| GobboError::io(format!("Failed to create {}", path.display()), e))
        }
        Err(e) => Some(GobboError::io(
            format!("Failed to stat {}", path.display()),
            e,
        )),
    }
}
