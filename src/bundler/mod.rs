//! Tarball pipeline for Node.js CLIs.
//!
//! Stages a clean workspace from `npm pack` output, installs production
//! dependencies from the project's lockfile, embeds a Node.js runtime per
//! target, and writes `.tar.gz` (optionally `.tar.xz`) archives plus update
//! manifests under `dist/`.
//!
//! # Output Layout
//!
//! | Artifact | Key |
//! |----------|-----|
//! | Base archive | `{channel}/{bin}/{bin}-v{version}.tar.gz` |
//! | Target archive | `{channel}/{bin}/{platform}-{arch}/{bin}-v{version}-{platform}-{arch}.tar.gz` |
//! | Manifest | `{channel}/{bin}[/{platform}-{arch}]/manifest.json` |
//! | macOS installer | `macos/{bin}-v{version}.pkg` |
//!
//! # Seams
//!
//! External commands go through [`CommandRunner`] and runtime binaries come
//! from a [`RuntimeBinaryProvider`], so the pipeline runs against fakes in
//! tests.

#![warn(missing_docs)]

pub mod archive;
pub(crate) mod builder;
pub mod checksum;
pub mod deps;
pub mod error;
pub mod launcher;
pub mod manifest;
pub mod platform;
pub mod runtime;
pub mod stage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Public re-exports
pub use builder::{BuildFlags, BuildReport, BuiltArchive, Bundler, NO_HOST_WARNING, build};
pub use error::{Error, Result};
pub use manifest::{Checksums, Manifest, RuntimeInfo};
pub use runtime::{NodeDistProvider, RuntimeBinaryProvider};
pub use stage::{LocalDependencies, LocalDependency};
pub use utils::process::{CommandRunner, Invocation, SystemRunner};
