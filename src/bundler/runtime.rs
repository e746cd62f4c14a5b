//! Runtime binaries embedded into target workspaces.
//!
//! [`NodeDistProvider`] fetches official Node.js builds from nodejs.org,
//! verifies them against the release's `SHASUMS256.txt` and keeps a copy in
//! the build cache so repeated builds stay offline.

use crate::bundler::archive;
use crate::bundler::error::{ErrorExt, Result};
use crate::bundler::utils::{fs, http};
use crate::target::{Arch, Platform, Target};
use std::future::Future;
use std::path::{Path, PathBuf};

/// Official Node.js distribution mirror.
pub const NODE_DIST_URL: &str = "https://nodejs.org/dist";

/// Supplies a runtime executable for a target.
pub trait RuntimeBinaryProvider: Send + Sync {
    /// Places the runtime for `target` at `dest`, marked executable.
    fn provide(&self, target: Target, dest: &Path) -> impl Future<Output = Result<()>> + Send;
}

/// Location of the runtime inside a workspace for `platform`.
pub fn binary_path(workspace: &Path, platform: Platform) -> PathBuf {
    let name = match platform {
        Platform::Win32 => "node.exe",
        Platform::Linux | Platform::Darwin => "node",
    };
    workspace.join("bin").join(name)
}

/// Downloads Node.js release binaries, caching them under `{cache}/node`.
#[derive(Debug, Clone)]
pub struct NodeDistProvider {
    version: String,
    cache: PathBuf,
    base_url: String,
}

impl NodeDistProvider {
    /// Provider for Node.js `version` (without leading `v`) caching under `cache_dir`.
    pub fn new(version: impl Into<String>, cache_dir: &Path) -> Self {
        Self {
            version: version.into(),
            cache: cache_dir.join("node"),
            base_url: NODE_DIST_URL.to_string(),
        }
    }

    /// Uses a different distribution mirror.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// File name of the distribution for `target` as listed in `SHASUMS256.txt`.
    pub fn dist_file(&self, target: Target) -> String {
        match target.platform {
            Platform::Win32 => format!("win-{}/node.exe", target.arch),
            Platform::Linux | Platform::Darwin => format!(
                "node-v{}-{}-{}.tar.gz",
                self.version,
                target.platform,
                dist_arch(target.arch)
            ),
        }
    }

    /// Cached executable for `target`.
    pub fn cached_binary(&self, target: Target) -> PathBuf {
        let name = format!("node-v{}-{}", self.version, target);
        binary_path(&self.cache.join(name), target.platform)
    }

    fn release_url(&self, file: &str) -> String {
        format!(
            "{}/v{}/{}",
            self.base_url.trim_end_matches('/'),
            self.version,
            file
        )
    }

    async fn fetch(&self, target: Target, cached: &Path) -> Result<()> {
        let file = self.dist_file(target);
        log::info!("downloading node {} for {}", self.version, target);

        let listing = http::download_text(&self.release_url("SHASUMS256.txt")).await?;
        let Some(expected) = http::find_checksum(&listing, &file) else {
            crate::bail!(
                "{} is not listed in SHASUMS256.txt for node v{}",
                file,
                self.version
            );
        };
        let data = http::download_and_verify(&self.release_url(&file), expected).await?;

        match target.platform {
            Platform::Win32 => {
                if let Some(parent) = cached.parent() {
                    fs::create_dir_all(parent, false).await?;
                }
                tokio::fs::write(cached, &data)
                    .await
                    .fs_context("writing cached runtime", cached)?;
            }
            Platform::Linux | Platform::Darwin => {
                fs::create_dir_all(&self.cache, false).await?;
                let tarball = self.cache.join(&file);
                tokio::fs::write(&tarball, &data)
                    .await
                    .fs_context("writing runtime tarball", &tarball)?;
                let root = file.trim_end_matches(".tar.gz");
                archive::extract_member(&tarball, &format!("{root}/bin/node"), cached).await?;
                fs::remove_file(&tarball).await?;
            }
        }
        Ok(())
    }
}

impl RuntimeBinaryProvider for NodeDistProvider {
    async fn provide(&self, target: Target, dest: &Path) -> Result<()> {
        let cached = self.cached_binary(target);
        if tokio::fs::try_exists(&cached).await.unwrap_or(false) {
            log::debug!("using cached runtime {}", cached.display());
        } else {
            self.fetch(target, &cached).await?;
        }
        fs::copy_file(&cached, dest).await?;
        fs::set_executable(dest).await
    }
}

fn dist_arch(arch: Arch) -> &'static str {
    match arch {
        Arch::Arm => "armv7l",
        other => other.as_str(),
    }
}
