//! Resolved, immutable configuration for one build invocation.

use super::project::{MacosSection, ProjectManifest, RolloutSetting};
use crate::bundler::{CommandRunner, Invocation, SystemRunner};
use crate::error::{ConfigError, ReleaseError, Result};
use crate::keys::KeyScheme;
use crate::target::{DEFAULT_TARGETS, Target};
use semver::Version;
use std::path::{Path, PathBuf};

/// Overrides supplied by the caller (usually the CLI) on top of package.json.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Explicit target list; replaces `oclif.update.node.targets`
    pub targets: Option<Vec<Target>>,
    /// Force xz archives on or off; replaces `oclif.update.s3.xz`
    pub xz: Option<bool>,
    /// Version to stamp instead of the resolved one
    pub version_override: Option<String>,
}

/// Update hosting configuration with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    /// Bucket written into the staged package.json
    pub bucket: Option<String>,
    /// Public host; `None` means a local-only build without manifests
    pub host: Option<String>,
    /// Validated rollout setting
    pub rollout: Option<Rollout>,
    /// Compatible runtime range (`engines.node`)
    pub runtime_compatible: Option<String>,
    /// Runtime version embedded into target builds
    pub runtime_recommended: String,
}

/// Rollout setting after range validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rollout {
    /// Percentage in 0..=100
    Percent(u8),
    /// Boolean toggle as written in package.json
    Flag(bool),
}

/// Everything the pipeline needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Absolute project root
    pub root: PathBuf,
    /// Executable name
    pub bin: String,
    /// Install directory name
    pub dirname: String,
    /// Resolved version (pre-releases carry a short revision suffix)
    pub version: String,
    /// Release channel
    pub channel: String,
    /// Scratch directory (`{root}/tmp`)
    pub tmp: PathBuf,
    /// Output directory (`{root}/dist`)
    pub dist: PathBuf,
    /// Targets to build
    pub targets: Vec<Target>,
    /// Whether to produce `.tar.xz` archives
    pub xz: bool,
    /// Update hosting configuration
    pub update: UpdateConfig,
    /// macOS installer configuration
    pub macos: Option<MacosSection>,
}

impl BuildConfig {
    /// Loads configuration for the project at `root`.
    ///
    /// Reads package.json, and only when needed queries git (pre-release
    /// versions) and the host `node` (no configured runtime version).
    /// Nothing is written to disk.
    pub async fn load(root: &Path, options: BuildOptions) -> Result<Self> {
        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|_| ConfigError::MissingPackageJson {
                path: root.join(super::PACKAGE_JSON),
            })?;
        let project = ProjectManifest::load(&root).await?;

        let version = match options.version_override.as_deref() {
            Some(v) if !v.trim().is_empty() => v.trim().to_string(),
            _ => {
                let parsed = parse_version(&project.version)?;
                let revision = if parsed.pre.is_empty() {
                    None
                } else {
                    Some(short_revision(&root)?)
                };
                stamp_version(&parsed, revision.as_deref())
            }
        };

        let runtime_recommended = match &project.oclif.update.node.version {
            Some(v) => v.trim_start_matches('v').to_string(),
            None => host_runtime_version(&SystemRunner, &root).await?,
        };

        let tmp = root.join("tmp");
        Self::resolve(root, tmp, project, options, version, runtime_recommended)
    }

    fn resolve(
        root: PathBuf,
        tmp: PathBuf,
        project: ProjectManifest,
        options: BuildOptions,
        version: String,
        runtime_recommended: String,
    ) -> Result<Self> {
        let update = &project.oclif.update;

        let targets = match (options.targets, &update.node.targets) {
            (Some(targets), _) => targets,
            (None, Some(configured)) => {
                Target::parse_list(configured).map_err(ConfigError::InvalidTarget)?
            }
            (None, None) => DEFAULT_TARGETS.to_vec(),
        };

        let host = match update.s3.host.as_deref() {
            Some(host) => {
                url::Url::parse(host).map_err(|e| ConfigError::InvalidHost {
                    host: host.to_string(),
                    reason: e.to_string(),
                })?;
                Some(host.to_string())
            }
            None => None,
        };

        let rollout = match update.autoupdate.as_ref().and_then(|a| a.rollout()) {
            Some(RolloutSetting::Percent(value)) => {
                let pct = u8::try_from(value)
                    .ok()
                    .filter(|p| *p <= 100)
                    .ok_or(ConfigError::InvalidRollout { value })?;
                Some(Rollout::Percent(pct))
            }
            Some(RolloutSetting::Flag(flag)) => Some(Rollout::Flag(flag)),
            None => None,
        };

        Ok(Self {
            bin: project.bin().to_string(),
            dirname: project.dirname().to_string(),
            channel: channel_of(&version),
            version,
            dist: root.join("dist"),
            tmp,
            targets,
            xz: options.xz.or(update.s3.xz).unwrap_or(false),
            update: UpdateConfig {
                bucket: update.s3.bucket.clone(),
                host,
                rollout,
                runtime_compatible: project.engines.node.clone(),
                runtime_recommended,
            },
            macos: project.oclif.macos.clone(),
            root,
        })
    }

    /// Workspace directory for `target`, or the base workspace for `None`.
    pub fn workspace(&self, target: Option<Target>) -> PathBuf {
        match target {
            Some(t) => self.tmp.join(t.to_string()).join(&self.bin),
            None => self.tmp.join(&self.bin),
        }
    }

    /// Path of `key` under the distribution directory.
    pub fn dist_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.dist.clone(), |path, segment| path.join(segment))
    }

    /// Download cache for runtime binaries.
    pub fn cache_dir(&self) -> PathBuf {
        self.tmp.join("cache")
    }

    /// Key resolver for this build.
    pub fn keys(&self) -> KeyScheme {
        KeyScheme::new(&self.bin, &self.channel, &self.version)
    }
}

fn parse_version(version: &str) -> Result<Version> {
    Version::parse(version).map_err(|source| {
        ReleaseError::from(ConfigError::InvalidVersion {
            version: version.to_string(),
            source,
        })
    })
}

/// Appends the short revision to pre-release versions.
pub(crate) fn stamp_version(version: &Version, revision: Option<&str>) -> String {
    match revision {
        Some(rev) if !version.pre.is_empty() => format!("{version}.{rev}"),
        _ => version.to_string(),
    }
}

/// Channel named by the first pre-release identifier, `stable` otherwise.
pub(crate) fn channel_of(version: &str) -> String {
    Version::parse(version)
        .ok()
        .and_then(|v| {
            v.pre
                .as_str()
                .split('.')
                .next()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "stable".to_string())
}

fn short_revision(root: &Path) -> Result<String> {
    let git_err = |reason: String| ConfigError::GitRevision {
        path: root.to_path_buf(),
        reason,
    };
    let repo = gix::discover(root).map_err(|e| git_err(e.to_string()))?;
    let head = repo.head_id().map_err(|e| git_err(e.to_string()))?;
    Ok(head.shorten_or_id().to_string())
}

async fn host_runtime_version<R: CommandRunner>(runner: &R, root: &Path) -> Result<String> {
    let stdout = runner
        .run(&Invocation::new("node", root).arg("--version"))
        .await
        .map_err(|e| ConfigError::RuntimeVersionUnavailable {
            reason: e.to_string(),
        })?;
    let version = stdout.trim().trim_start_matches('v');
    if version.is_empty() {
        return Err(ConfigError::RuntimeVersionUnavailable {
            reason: "`node --version` printed nothing".to_string(),
        }
        .into());
    }
    Ok(version.to_string())
}
