//! Error types for tarball release operations.
//!
//! This module defines all error types with actionable error messages and recovery suggestions.

use crate::target::ParseTargetError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for tarball release operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all tarball release operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Project configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Host/environment mismatch
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline errors (staging, installs, archives, manifests)
    #[error("Bundler error: {0}")]
    Bundler(#[from] crate::bundler::Error),
}

/// Errors in the packaged project's configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// package.json not found under the root
    #[error("No package.json found at {path}")]
    MissingPackageJson {
        /// Path where package.json was expected
        path: PathBuf,
    },

    /// package.json could not be parsed
    #[error("Invalid package.json at {path}: {reason}")]
    InvalidPackageJson {
        /// Path to package.json
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Version is not valid semver
    #[error("Invalid version '{version}': {source}")]
    InvalidVersion {
        /// Version string
        version: String,
        /// Parsing error
        #[source]
        source: semver::Error,
    },

    /// Target identifier rejected
    #[error("Invalid target: {0}")]
    InvalidTarget(#[from] ParseTargetError),

    /// Rollout percentage out of range
    #[error("Invalid rollout percentage {value}: must be between 0 and 100")]
    InvalidRollout {
        /// Configured value
        value: u64,
    },

    /// Update host is not a URL
    #[error("Invalid update host '{host}': {reason}")]
    InvalidHost {
        /// Configured host
        host: String,
        /// Reason for the error
        reason: String,
    },

    /// Installer wrapping requested without an identifier
    #[error("package.json must have oclif.macos.identifier set")]
    MissingInstallerIdentifier,

    /// Could not determine which runtime version to embed
    #[error("Could not determine runtime version: {reason}")]
    RuntimeVersionUnavailable {
        /// Reason for the error
        reason: String,
    },

    /// Could not read the source revision for a pre-release version
    #[error("Could not read git revision of {path}: {reason}")]
    GitRevision {
        /// Repository path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// Host/environment mismatch errors
#[derive(Error, Debug)]
pub enum HostError {
    /// Operation only runs on a specific OS family
    #[error("must be run from {expected} (current host: {found})")]
    WrongHost {
        /// Required host OS family
        expected: &'static str,
        /// Actual host OS
        found: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::MissingPackageJson { .. }) => vec![
                "Pass the CLI project root with --root".to_string(),
            ],
            ReleaseError::Config(ConfigError::MissingInstallerIdentifier) => vec![
                "Add \"oclif\": { \"macos\": { \"identifier\": \"com.example.mycli\" } } to package.json"
                    .to_string(),
            ],
            ReleaseError::Config(ConfigError::InvalidTarget(_)) => vec![
                "Use <platform>-<arch> identifiers such as linux-x64, win32-x86 or darwin-arm64".to_string(),
            ],
            ReleaseError::Config(ConfigError::RuntimeVersionUnavailable { .. }) => vec![
                "Set oclif.update.node.version in package.json".to_string(),
                "Or install node so `node --version` can be queried".to_string(),
            ],
            ReleaseError::Host(HostError::WrongHost { expected, .. }) => vec![
                format!("Run this command on a {expected} machine"),
            ],
            ReleaseError::Bundler(crate::bundler::Error::MissingLockfile { .. }) => vec![
                "Commit a lockfile: run `npm install` or `yarn install` in the project root".to_string(),
            ],
            ReleaseError::Bundler(crate::bundler::Error::ToolNotFound { tool }) => vec![
                format!("Install '{tool}' and make sure it is on PATH"),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }
}
