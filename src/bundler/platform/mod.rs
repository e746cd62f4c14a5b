//! Platform-specific installer wrapping.
//!
//! | Platform | Package Types | Module |
//! |----------|--------------|---------|
//! | macOS | .pkg (pkgbuild) | [`macos`] |
//!
//! Wrapping only runs on its own host OS family; the check happens at run
//! time so configuration errors are reported the same way on every host.

pub mod macos;
