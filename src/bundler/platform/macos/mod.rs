//! macOS installer packages.
//!
//! # Build Requirements
//!
//! | Format | Required Tools | Notes |
//! |--------|----------------|-------|
//! | .pkg | `pkgbuild` | Built into macOS |
//! | Signing | Developer ID Installer identity | Optional, `oclif.macos.sign` |
//!
//! # Output Location
//!
//! Packages are created in `dist/macos/{bin}-v{version}.pkg`. The package
//! installs into `/usr/local/lib/{dirname}` and links the launcher into
//! `/usr/local/bin`.

pub mod pkg;

pub use pkg::{PkgSettings, PkgScripts, preflight, wrap};
