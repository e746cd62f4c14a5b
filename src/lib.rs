//! # Kodegen Bundler Tarballs
//!
//! Builds self-contained, versioned tarball distributions of a Node.js CLI.
//!
//! Every archive carries the packed project, its production dependencies and
//! launcher scripts; per-target archives additionally embed a Node.js runtime.
//! Each archive gets a JSON update manifest that the CLI's autoupdate client
//! polls, and `pack-macos` wraps the darwin build into a `.pkg` installer.
//!
//! ## Usage
//!
//! ```bash
//! kodegen_bundler_tarballs build                       # all configured targets
//! kodegen_bundler_tarballs build --targets linux-x64   # a subset
//! kodegen_bundler_tarballs build --xz --no-pack        # workspaces only
//! kodegen_bundler_tarballs pack-macos                  # signed-ready .pkg
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Core modules
pub mod bundler;
pub mod cli;
pub mod config;
pub mod error;
pub mod keys;
pub mod target;

// Re-export main types for public API
pub use bundler::{BuildFlags, BuildReport, Bundler, Manifest};
pub use cli::Args;
pub use config::{BuildConfig, BuildOptions};
pub use error::{CliError, ConfigError, HostError, ReleaseError, Result};
pub use keys::{ArchiveFormat, KeyKind, KeyScheme};
pub use target::{Arch, Platform, Target};
