//! Build orchestration: the base tarball and the per-target matrix.
//!
//! # Overview
//!
//! The bundler:
//! 1. Stages the base workspace from `npm pack` output
//! 2. Installs production dependencies and links local ones
//! 3. Writes launcher scripts
//! 4. Packs the base workspace and writes its manifest
//! 5. For each target, copies the base workspace, embeds the runtime,
//!    packs it and writes the target manifest
//!
//! Targets are built one after another. Each target owns its workspace
//! directory, and every external command receives its working directory
//! explicitly.

use crate::bundler::manifest::{Checksums, Manifest};
use crate::bundler::runtime::{self, RuntimeBinaryProvider};
use crate::bundler::utils::fs;
use crate::bundler::utils::process::CommandRunner;
use crate::bundler::{Result, checksum, deps, launcher, stage};
use crate::config::BuildConfig;
use crate::keys::{ArchiveFormat, KeyKind};
use crate::target::{Platform, Target};
use std::path::{Path, PathBuf};

/// Warning recorded when no update host is configured.
pub const NO_HOST_WARNING: &str =
    "No bucket or host configured. CLI will not be able to update.";

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildFlags {
    /// Only build targets of this platform
    pub platform: Option<Platform>,
    /// Produce archives and manifests; `false` stops after workspaces are prepared
    pub pack: bool,
}

impl Default for BuildFlags {
    fn default() -> Self {
        Self {
            platform: None,
            pack: true,
        }
    }
}

/// An archive written under the distribution directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArchive {
    /// Target, or `None` for the base build
    pub target: Option<Target>,
    /// Compression format
    pub format: ArchiveFormat,
    /// Path on disk
    pub path: PathBuf,
}

/// Outcome of a successful build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Staged base workspace
    pub base_workspace: PathBuf,
    /// Archives written, base first
    pub archives: Vec<BuiltArchive>,
    /// Manifests written, base first
    pub manifests: Vec<PathBuf>,
    /// Non-fatal problems
    pub warnings: Vec<String>,
}

/// Tarball build orchestrator.
///
/// # Examples
///
/// ```no_run
/// use kodegen_bundler_tarballs::bundler::{BuildFlags, Bundler, NodeDistProvider, SystemRunner};
/// use kodegen_bundler_tarballs::config::{BuildConfig, BuildOptions};
///
/// # async fn example() -> kodegen_bundler_tarballs::Result<()> {
/// let config = BuildConfig::load(".".as_ref(), BuildOptions::default()).await?;
/// let provider = NodeDistProvider::new(&config.update.runtime_recommended, &config.cache_dir());
/// let report = Bundler::new(&config, &provider, &SystemRunner)
///     .build(BuildFlags::default())
///     .await?;
/// println!("{} archives", report.archives.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Bundler<'a, P, R> {
    config: &'a BuildConfig,
    provider: &'a P,
    runner: &'a R,
}

impl<'a, P, R> Bundler<'a, P, R>
where
    P: RuntimeBinaryProvider,
    R: CommandRunner,
{
    /// Creates a bundler for `config`.
    pub fn new(config: &'a BuildConfig, provider: &'a P, runner: &'a R) -> Self {
        Self {
            config,
            provider,
            runner,
        }
    }

    /// Runs the whole pipeline.
    ///
    /// Any failing step aborts the build; partially written workspaces and
    /// archives are left in place for inspection.
    pub async fn build(&self, flags: BuildFlags) -> Result<BuildReport> {
        let config = self.config;
        let base = config.workspace(None);
        let mut report = BuildReport {
            base_workspace: base.clone(),
            ..BuildReport::default()
        };

        let local = stage::stage(config, self.runner).await?;
        deps::install(&config.root, &base, &local, self.runner).await?;
        launcher::write_bin_scripts(&base, &config.bin).await?;

        self.build_base(flags, &mut report).await?;

        let targets = config
            .targets
            .iter()
            .copied()
            .filter(|t| flags.platform.is_none_or(|p| p == t.platform));
        for target in targets {
            self.build_target(target, flags, &mut report).await?;
        }

        log::info!(
            "built {} archive(s) and {} manifest(s)",
            report.archives.len(),
            report.manifests.len()
        );
        Ok(report)
    }

    /// Packs the base workspace and writes the base manifest.
    ///
    /// Does nothing when packing is disabled. Without an update host the
    /// archives are still produced and a warning is recorded.
    pub async fn build_base(&self, flags: BuildFlags, report: &mut BuildReport) -> Result<()> {
        if !flags.pack {
            return Ok(());
        }
        let workspace = self.config.workspace(None);
        self.pack_scope(None, &workspace, report).await?;

        match self.config.update.host.as_deref() {
            Some(host) => {
                let path = self.write_manifest(None, host).await?;
                report.manifests.push(path);
            }
            None => {
                log::warn!("{}", NO_HOST_WARNING);
                report.warnings.push(NO_HOST_WARNING.to_string());
            }
        }
        Ok(())
    }

    /// Builds one target from the staged base workspace.
    pub async fn build_target(
        &self,
        target: Target,
        flags: BuildFlags,
        report: &mut BuildReport,
    ) -> Result<()> {
        let config = self.config;
        let workspace = config.workspace(Some(target));
        let key = config
            .keys()
            .resolve(KeyKind::Versioned(ArchiveFormat::Gzip), Some(target));
        log::info!(
            "building target {}",
            key.rsplit('/').next().unwrap_or(key.as_str())
        );

        fs::remove_dir_all(&workspace).await?;
        fs::copy_dir(&config.workspace(None), &workspace).await?;
        self.provider
            .provide(target, &runtime::binary_path(&workspace, target.platform))
            .await?;

        if !flags.pack {
            return Ok(());
        }
        self.pack_scope(Some(target), &workspace, report).await?;

        if let Some(host) = config.update.host.as_deref() {
            let path = self.write_manifest(Some(target), host).await?;
            report.manifests.push(path);
        }
        Ok(())
    }

    fn formats(&self) -> Vec<ArchiveFormat> {
        let mut formats = vec![ArchiveFormat::Gzip];
        if self.config.xz {
            formats.push(ArchiveFormat::Xz);
        }
        formats
    }

    fn archive_path(&self, target: Option<Target>, format: ArchiveFormat) -> PathBuf {
        let key = self.config.keys().resolve(KeyKind::Versioned(format), target);
        self.config.dist_path(&key)
    }

    async fn pack_scope(
        &self,
        target: Option<Target>,
        workspace: &Path,
        report: &mut BuildReport,
    ) -> Result<()> {
        for format in self.formats() {
            let path = self.archive_path(target, format);
            crate::bundler::archive::pack(workspace, &path, format).await?;
            report.archives.push(BuiltArchive {
                target,
                format,
                path,
            });
        }
        Ok(())
    }

    async fn write_manifest(&self, target: Option<Target>, host: &str) -> Result<PathBuf> {
        let config = self.config;
        let keys = config.keys();

        let gz = checksum::sha256_file(&self.archive_path(target, ArchiveFormat::Gzip)).await?;
        let xz = if config.xz {
            Some(checksum::sha256_file(&self.archive_path(target, ArchiveFormat::Xz)).await?)
        } else {
            None
        };

        let manifest = Manifest::assemble(&keys, host, target, Checksums { gz, xz }, &config.update);
        let path = config.dist_path(&keys.resolve(KeyKind::Manifest, target));
        manifest.write(&path).await?;
        log::debug!("wrote manifest {}", path.display());
        Ok(path)
    }
}

/// Runs the whole pipeline for `config`. See [`Bundler::build`].
pub async fn build<P, R>(
    config: &BuildConfig,
    flags: BuildFlags,
    provider: &P,
    runner: &R,
) -> Result<BuildReport>
where
    P: RuntimeBinaryProvider,
    R: CommandRunner,
{
    Bundler::new(config, provider, runner).build(flags).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::testing::{FakeRuntime, RecordingRunner, fixture_project, fixture_project_with};
    use crate::config::BuildOptions;
    use crate::keys::KeyScheme;
    use crate::target::{Arch, DEFAULT_TARGETS};
    use serde_json::{Value, json};

    fn manifests_under(dir: &Path) -> Vec<PathBuf> {
        if !dir.exists() {
            return Vec::new();
        }
        walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() == "manifest.json")
            .map(|e| e.into_path())
            .collect()
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&std::fs::read_to_string(path).expect("read")).expect("json")
    }

    fn linux_x64() -> Target {
        Target::new(Platform::Linux, Arch::X64)
    }

    async fn load(root: &Path, targets: Vec<Target>) -> BuildConfig {
        BuildConfig::load(
            root,
            BuildOptions {
                targets: Some(targets),
                ..BuildOptions::default()
            },
        )
        .await
        .expect("config")
    }

    #[tokio::test]
    async fn single_target_with_host_writes_one_target_manifest() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project_with(
            tmp.path(),
            "{}",
            json!({"s3": {"bucket": "my-bucket", "host": "https://cdn.example.com"}}),
            None,
        );
        let config = load(&fixture.root, vec![linux_x64()]).await;
        let runner = RecordingRunner::new(&fixture.package);
        let runtime = FakeRuntime::default();

        let report = build(&config, BuildFlags::default(), &runtime, &runner)
            .await
            .expect("builds");

        assert!(report.warnings.is_empty());
        assert_eq!(runtime.provided(), vec![linux_x64()]);

        let target_manifest = config.dist.join("stable/mycli/linux-x64/manifest.json");
        let all = manifests_under(&config.dist.join("stable/mycli/linux-x64"));
        assert_eq!(all, vec![target_manifest.clone()]);

        let json = read_json(&target_manifest);
        let obj = json.as_object().expect("object");
        assert_eq!(
            obj["gz"],
            "https://cdn.example.com/stable/mycli/linux-x64/mycli-v1.0.0-linux-x64.tar.gz"
        );
        assert_eq!(obj["sha256gz"].as_str().map(str::len), Some(64));
        assert!(!obj.contains_key("xz"));
        assert!(!obj.contains_key("sha256xz"));
        assert!(!obj.contains_key("rollout"));
        assert_eq!(obj["baseDir"], "stable/mycli/linux-x64");
        assert_eq!(obj["node"]["recommended"], "20.11.1");
        assert_eq!(obj["node"]["compatible"], ">=18.0.0");

        let expected = checksum::sha256_file(
            &config
                .dist
                .join("stable/mycli/linux-x64/mycli-v1.0.0-linux-x64.tar.gz"),
        )
        .await
        .expect("digest");
        assert_eq!(obj["sha256gz"], expected.as_str());

        assert_eq!(
            report.manifests,
            vec![config.dist.join("stable/mycli/manifest.json"), target_manifest]
        );
    }

    #[tokio::test]
    async fn xz_archives_are_listed_in_manifests() {
        if which::which("xz").is_err() {
            eprintln!("xz not on PATH, skipping");
            return;
        }
        let tmp = tempfile::tempdir().expect("tempdir");
        let host = "https://cdn.example.com";
        let fixture = fixture_project_with(
            tmp.path(),
            "{}",
            json!({"s3": {"host": host, "xz": true}}),
            None,
        );
        let config = load(&fixture.root, vec![linux_x64()]).await;
        assert!(config.xz);
        let runner = RecordingRunner::new(&fixture.package);

        let report = build(&config, BuildFlags::default(), &FakeRuntime::default(), &runner)
            .await
            .expect("builds");
        assert_eq!(report.archives.len(), 4);

        let keys = config.keys();
        for target in [None, Some(linux_x64())] {
            let key = keys.resolve(KeyKind::Versioned(ArchiveFormat::Xz), target);
            let archive = config.dist_path(&key);
            assert!(archive.is_file(), "missing {key}");

            let manifest = read_json(&config.dist_path(&keys.resolve(KeyKind::Manifest, target)));
            let digest = checksum::sha256_file(&archive).await.expect("digest");
            assert_eq!(manifest["sha256xz"], digest.as_str());
            assert_eq!(manifest["xz"], KeyScheme::url(host, &key).as_str());
            assert_ne!(manifest["sha256xz"], manifest["sha256gz"]);
        }
    }

    #[tokio::test]
    async fn missing_host_still_packs_every_target() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project(tmp.path(), "{}");
        let config = load(&fixture.root, DEFAULT_TARGETS.to_vec()).await;
        let runner = RecordingRunner::new(&fixture.package);
        let runtime = FakeRuntime::default();

        let report = build(&config, BuildFlags::default(), &runtime, &runner)
            .await
            .expect("builds");

        assert!(manifests_under(&config.dist).is_empty());
        assert!(report.manifests.is_empty());
        assert_eq!(report.warnings, vec![NO_HOST_WARNING.to_string()]);

        assert!(config.dist.join("stable/mycli/mycli-v1.0.0.tar.gz").is_file());
        for target in DEFAULT_TARGETS {
            let key = config
                .keys()
                .resolve(KeyKind::Versioned(ArchiveFormat::Gzip), Some(target));
            assert!(config.dist_path(&key).is_file(), "missing archive for {target}");
        }
        assert_eq!(report.archives.len(), 1 + DEFAULT_TARGETS.len());
    }

    #[tokio::test]
    async fn rollout_false_differs_between_base_and_target() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project_with(
            tmp.path(),
            "{}",
            json!({
                "s3": {"host": "https://cdn.example.com"},
                "autoupdate": {"rollout": false}
            }),
            None,
        );
        let config = load(&fixture.root, vec![linux_x64()]).await;
        let runner = RecordingRunner::new(&fixture.package);

        build(&config, BuildFlags::default(), &FakeRuntime::default(), &runner)
            .await
            .expect("builds");

        let base = read_json(&config.dist.join("stable/mycli/manifest.json"));
        let target = read_json(&config.dist.join("stable/mycli/linux-x64/manifest.json"));
        assert_eq!(base["rollout"], 0);
        assert!(target.get("rollout").is_none());
    }

    #[tokio::test]
    async fn target_workspace_embeds_runtime_and_launchers() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project(tmp.path(), "{}");
        let win = Target::new(Platform::Win32, Arch::X64);
        let config = load(&fixture.root, vec![linux_x64(), win]).await;
        let runner = RecordingRunner::new(&fixture.package);

        let flags = BuildFlags {
            platform: None,
            pack: false,
        };
        let report = build(&config, flags, &FakeRuntime::default(), &runner)
            .await
            .expect("builds");

        assert!(report.archives.is_empty());
        assert!(report.warnings.is_empty());
        assert!(!config.dist.exists());

        let linux = config.workspace(Some(linux_x64()));
        assert_eq!(
            std::fs::read_to_string(linux.join("bin/node")).expect("runtime"),
            "runtime for linux-x64"
        );
        assert!(linux.join("bin/mycli").is_file());
        assert!(linux.join("bin/mycli.cmd").is_file());
        assert!(config.workspace(Some(win)).join("bin/node.exe").is_file());
        assert!(!config.workspace(None).join("bin/node").exists());
    }

    #[tokio::test]
    async fn platform_filter_limits_targets() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project(tmp.path(), "{}");
        let config = load(&fixture.root, DEFAULT_TARGETS.to_vec()).await;
        let runner = RecordingRunner::new(&fixture.package);
        let runtime = FakeRuntime::default();

        let flags = BuildFlags {
            platform: Some(Platform::Darwin),
            pack: false,
        };
        build(&config, flags, &runtime, &runner).await.expect("builds");

        assert_eq!(
            runtime.provided(),
            vec![Target::new(Platform::Darwin, Arch::X64)]
        );
    }

    #[tokio::test]
    async fn commands_run_in_explicit_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project(tmp.path(), r#"{"shared":"file:../shared"}"#);
        let config = load(&fixture.root, vec![linux_x64()]).await;
        let runner = RecordingRunner::new(&fixture.package);

        build(&config, BuildFlags::default(), &FakeRuntime::default(), &runner)
            .await
            .expect("builds");

        let calls = runner.calls();
        let lines: Vec<_> = calls.iter().map(|c| c.command_line()).collect();
        assert_eq!(
            lines,
            [
                "npm pack --unsafe-perm",
                "npm install --production",
                "npx install-local@^1.0.0 ../../../shared",
            ]
        );
        assert_eq!(calls[0].cwd, config.root);
        assert_eq!(calls[1].cwd, config.workspace(None));
        assert_eq!(calls[2].cwd, config.workspace(None));
    }

    #[tokio::test]
    async fn failed_pack_aborts_build() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let fixture = fixture_project(tmp.path(), "{}");
        let config = load(&fixture.root, vec![linux_x64()]).await;
        let runner = RecordingRunner::new(&fixture.package).failing("npm");

        let result = build(&config, BuildFlags::default(), &FakeRuntime::default(), &runner).await;
        assert!(result.is_err());
        assert!(!config.dist.exists());
    }
}
