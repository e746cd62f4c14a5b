//! Typed view of the packaged project's `package.json`.
//!
//! Only the fields the pipeline reads are modelled. Every optional section is
//! an `Option` or defaults to empty so that a bare `{ "name", "version" }`
//! manifest still loads; defaulting beyond that happens once in
//! [`BuildConfig::load`](super::BuildConfig::load).

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// File name of the project manifest.
pub const PACKAGE_JSON: &str = "package.json";

/// The subset of `package.json` the pipeline needs.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectManifest {
    /// Package name
    pub name: String,
    /// Package version (semver)
    pub version: String,
    /// `engines` section
    #[serde(default)]
    pub engines: Engines,
    /// `oclif` section
    #[serde(default)]
    pub oclif: OclifSection,
}

/// `engines` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Engines {
    /// Compatible Node.js range, e.g. `>=18.0.0`
    pub node: Option<String>,
}

/// `oclif` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OclifSection {
    /// Executable name (defaults to the package name)
    pub bin: Option<String>,
    /// Install directory name (defaults to the executable name)
    pub dirname: Option<String>,
    /// Update hosting configuration
    #[serde(default)]
    pub update: UpdateSection,
    /// macOS installer configuration
    pub macos: Option<MacosSection>,
}

/// `oclif.update` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSection {
    /// Object storage settings
    #[serde(default)]
    pub s3: S3Section,
    /// Autoupdate behaviour; either an object or a bare boolean
    pub autoupdate: Option<AutoupdateSetting>,
    /// Runtime settings
    #[serde(default)]
    pub node: NodeSection,
}

/// `oclif.update.s3` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Section {
    /// Bucket name stamped into the staged package.json
    pub bucket: Option<String>,
    /// Public host the archives are served from
    pub host: Option<String>,
    /// Whether to also produce `.tar.xz` archives
    pub xz: Option<bool>,
}

/// `oclif.update.autoupdate`, which projects write either as an object or a flag.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AutoupdateSetting {
    /// `{ "rollout": ... }`
    Config {
        /// Staged rollout setting
        rollout: Option<RolloutSetting>,
    },
    /// `true` / `false`
    Enabled(bool),
}

impl AutoupdateSetting {
    /// Rollout setting, present only in the object form.
    pub fn rollout(&self) -> Option<RolloutSetting> {
        match self {
            Self::Config { rollout } => *rollout,
            Self::Enabled(_) => None,
        }
    }
}

/// `rollout` value: a percentage or a boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RolloutSetting {
    /// Percentage of clients, validated to 0..=100 at load time
    Percent(u64),
    /// Boolean toggle
    Flag(bool),
}

/// `oclif.update.node` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeSection {
    /// Node.js version to embed
    pub version: Option<String>,
    /// Target identifiers to build
    pub targets: Option<Vec<String>>,
}

/// `oclif.macos` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MacosSection {
    /// Installer package identifier, e.g. `com.example.mycli`
    pub identifier: Option<String>,
    /// Code signing identity passed to pkgbuild
    pub sign: Option<String>,
}

impl ProjectManifest {
    /// Reads and parses `{root}/package.json`.
    pub async fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(PACKAGE_JSON);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| ConfigError::MissingPackageJson { path: path.clone() })?;
        Self::parse(&content).map_err(|e| ConfigError::InvalidPackageJson {
            path,
            reason: e.to_string(),
        })
    }

    /// Parses manifest content.
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    /// Executable name.
    pub fn bin(&self) -> &str {
        self.oclif.bin.as_deref().unwrap_or(&self.name)
    }

    /// Install directory name.
    pub fn dirname(&self) -> &str {
        self.oclif.dirname.as_deref().unwrap_or_else(|| self.bin())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_manifest_defaults() {
        let m = ProjectManifest::parse(r#"{"name":"mycli","version":"1.0.0"}"#).expect("parses");
        assert_eq!(m.bin(), "mycli");
        assert_eq!(m.dirname(), "mycli");
        assert!(m.oclif.update.s3.host.is_none());
        assert!(m.oclif.update.autoupdate.is_none());
        assert!(m.oclif.macos.is_none());
    }

    #[test]
    fn bin_and_dirname_overrides() {
        let m = ProjectManifest::parse(
            r#"{"name":"@acme/cli","version":"1.0.0","oclif":{"bin":"acme","dirname":"acme-cli"}}"#,
        )
        .expect("parses");
        assert_eq!(m.bin(), "acme");
        assert_eq!(m.dirname(), "acme-cli");
    }

    #[test]
    fn rollout_accepts_number_or_bool() {
        let m = ProjectManifest::parse(
            r#"{"name":"a","version":"1.0.0","oclif":{"update":{"autoupdate":{"rollout":42}}}}"#,
        )
        .expect("parses");
        assert_eq!(
            m.oclif.update.autoupdate.and_then(|a| a.rollout()),
            Some(RolloutSetting::Percent(42))
        );

        let m = ProjectManifest::parse(
            r#"{"name":"a","version":"1.0.0","oclif":{"update":{"autoupdate":{"rollout":false}}}}"#,
        )
        .expect("parses");
        assert_eq!(
            m.oclif.update.autoupdate.and_then(|a| a.rollout()),
            Some(RolloutSetting::Flag(false))
        );
    }

    #[test]
    fn autoupdate_flag_has_no_rollout() {
        let m = ProjectManifest::parse(
            r#"{"name":"a","version":"1.0.0","oclif":{"update":{"autoupdate":true}}}"#,
        )
        .expect("parses");
        assert_eq!(m.oclif.update.autoupdate.and_then(|a| a.rollout()), None);
    }

    #[tokio::test]
    async fn malformed_package_json_is_a_config_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join(PACKAGE_JSON), "{\"name\": ").expect("write");

        let err = ProjectManifest::load(tmp.path()).await.expect_err("malformed");
        assert!(matches!(err, ConfigError::InvalidPackageJson { .. }));
        let missing = ProjectManifest::load(&tmp.path().join("nope")).await.expect_err("missing");
        assert!(matches!(missing, ConfigError::MissingPackageJson { .. }));
    }
}
