//! Update manifests consumed by the autoupdate client.
//!
//! Optional fields are omitted from the JSON when absent, never written as
//! `null`. An absent `xz` means no xz archive was produced and an absent
//! `rollout` means full rollout.

use crate::bundler::error::{ErrorExt, Result};
use crate::bundler::utils::fs;
use crate::config::{Rollout, UpdateConfig};
use crate::keys::{ArchiveFormat, KeyKind, KeyScheme};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One update manifest, for a target or for the base build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Resolved version
    pub version: String,
    /// Release channel
    pub channel: String,
    /// Base directory key
    #[serde(rename = "baseDir")]
    pub base_dir: String,
    /// URL of the `.tar.gz` archive
    pub gz: String,
    /// URL of the `.tar.xz` archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xz: Option<String>,
    /// SHA-256 of the `.tar.gz` archive
    pub sha256gz: String,
    /// SHA-256 of the `.tar.xz` archive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256xz: Option<String>,
    /// Rollout percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollout: Option<u8>,
    /// Runtime compatibility
    pub node: RuntimeInfo,
}

/// Runtime compatibility block of a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeInfo {
    /// Compatible version range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatible: Option<String>,
    /// Concrete version embedded in target builds
    pub recommended: String,
}

/// Digests of the archives produced for one scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checksums {
    /// SHA-256 of the `.tar.gz`
    pub gz: String,
    /// SHA-256 of the `.tar.xz`, when one was produced
    pub xz: Option<String>,
}

/// Rollout value written into a target manifest.
///
/// Only a percentage is carried over; a boolean rollout means full rollout.
pub fn target_rollout(rollout: Option<Rollout>) -> Option<u8> {
    match rollout {
        Some(Rollout::Percent(pct)) => Some(pct),
        Some(Rollout::Flag(_)) | None => None,
    }
}

/// Rollout value written into the base manifest.
///
/// Unlike [`target_rollout`], `false` becomes `0` here. Update clients may
/// treat an absent rollout and a zero rollout differently, so the two stay
/// distinct.
pub fn base_rollout(rollout: Option<Rollout>) -> Option<u8> {
    match rollout {
        Some(Rollout::Percent(pct)) => Some(pct),
        Some(Rollout::Flag(false)) => Some(0),
        Some(Rollout::Flag(true)) | None => None,
    }
}

impl Manifest {
    /// Assembles the manifest for `target`, or for the base build when `None`.
    pub fn assemble(
        keys: &KeyScheme,
        host: &str,
        target: Option<Target>,
        checksums: Checksums,
        update: &UpdateConfig,
    ) -> Self {
        let url = |format| KeyScheme::url(host, &keys.resolve(KeyKind::Versioned(format), target));
        let rollout = match target {
            Some(_) => target_rollout(update.rollout),
            None => base_rollout(update.rollout),
        };

        Self {
            version: keys.version().to_string(),
            channel: keys.channel().to_string(),
            base_dir: keys.resolve(KeyKind::BaseDir, target),
            gz: url(ArchiveFormat::Gzip),
            xz: checksums.xz.as_ref().map(|_| url(ArchiveFormat::Xz)),
            sha256gz: checksums.gz,
            sha256xz: checksums.xz,
            rollout,
            node: RuntimeInfo {
                compatible: update.runtime_compatible.clone(),
                recommended: update.runtime_recommended.clone(),
            },
        }
    }

    /// Writes the manifest as pretty-printed JSON, creating parent directories.
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent, false).await?;
        }
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        tokio::fs::write(path, json)
            .await
            .fs_context("writing manifest", path)
    }

    /// Reads a manifest back from disk.
    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .fs_context("reading manifest", path)?;
        Ok(serde_json::from_str(&content)?)
    }
}
