//! Godot toolchain management.
//!
//! Resolves Godot versions, installs official builds into a local store and
//! launches them.
//!
//! ## Module Structure
//!
//! - [`config`] - Store root and remote hosts from flags and environment
//! - [`platform`] - OS and architecture detection
//! - [`version`] - Version parsing, formatting and download URLs
//! - [`releases`] - Current-release lookup for the `stable` and `latest` streams
//! - [`store`] - Store layout and schema checks
//! - [`stream_cache`] - Day-long cache of stream lookups
//! - [`download`] - Resumable HTTP download with progress tracking
//! - [`archive`] - ZIP extraction
//! - [`normalize`] - Per-OS renaming of extracted archives
//! - [`installer`] - Install, locate and clean up builds
//! - [`supervisor`] - Foreground and supervised process launch
//! - [`resolve`] - Entry points tying the above together

pub mod archive;
pub mod config;
pub mod download;
pub mod installer;
pub mod normalize;
pub mod platform;
pub mod releases;
pub mod resolve;
pub mod store;
pub mod stream_cache;
pub mod supervisor;
pub mod version;

pub use config::Settings;
pub use platform::Platform;
pub use resolve::{InstallMode, Toolchain};
pub use store::Store;
pub use version::{GodotVersion, Stream};
