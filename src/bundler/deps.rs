//! Production dependency installation for the staged workspace.
//!
//! The project's lockfile is copied into the workspace first so the install
//! reproduces the tested dependency tree instead of resolving ranges afresh.

use crate::bundler::error::{Error, Result};
use crate::bundler::stage::LocalDependencies;
use crate::bundler::utils::fs;
use crate::bundler::utils::process::{CommandRunner, Invocation};
use std::path::Path;

/// Version range of the helper that links local dependencies.
const INSTALL_LOCAL: &str = "install-local@^1.0.0";

/// Lockfile family found in the project root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lockfile {
    /// `yarn.lock`
    Yarn,
    /// `package-lock.json`
    NpmLock,
    /// `npm-shrinkwrap.json`
    NpmShrinkwrap,
}

impl Lockfile {
    /// File name in the project root.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Yarn => "yarn.lock",
            Self::NpmLock => "package-lock.json",
            Self::NpmShrinkwrap => "npm-shrinkwrap.json",
        }
    }

    /// Production-only install command for this lockfile family.
    fn install(&self, workspace: &Path) -> Invocation {
        match self {
            Self::Yarn => Invocation::new("yarn", workspace).args([
                "--no-progress",
                "--production",
                "--non-interactive",
            ]),
            Self::NpmLock | Self::NpmShrinkwrap => {
                Invocation::new("npm", workspace).args(["install", "--production"])
            }
        }
    }

    /// Detects the lockfile in `root`. Yarn wins over npm, and
    /// `package-lock.json` over `npm-shrinkwrap.json`.
    pub async fn detect(root: &Path) -> Result<Self> {
        for lockfile in [Self::Yarn, Self::NpmLock, Self::NpmShrinkwrap] {
            if tokio::fs::try_exists(root.join(lockfile.file_name()))
                .await
                .unwrap_or(false)
            {
                return Ok(lockfile);
            }
        }
        Err(Error::MissingLockfile {
            root: root.to_path_buf(),
        })
    }
}

/// Installs production dependencies of `workspace` using the lockfile of `root`,
/// then links each local dependency in declaration order.
pub async fn install<R: CommandRunner>(
    root: &Path,
    workspace: &Path,
    local: &LocalDependencies,
    runner: &R,
) -> Result<()> {
    let lockfile = Lockfile::detect(root).await?;
    log::info!("installing production dependencies with {}", lockfile.file_name());

    fs::copy_file(
        &root.join(lockfile.file_name()),
        &workspace.join(lockfile.file_name()),
    )
    .await?;
    runner.run(&lockfile.install(workspace)).await?;

    for dependency in local {
        log::info!("linking local dependency {} from {}", dependency.name, dependency.path);
        runner
            .run(&Invocation::new("npx", workspace).args([INSTALL_LOCAL, dependency.path.as_str()]))
            .await?;
    }
    Ok(())
}
