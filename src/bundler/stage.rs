//! Workspace staging.
//!
//! Packs the project with `npm pack`, extracts the result into an emptied
//! base workspace and rewrites the staged `package.json` for the build:
//! version, update bucket, and `file:` dependencies made relative to the
//! workspace instead of the project root.

use crate::bundler::archive;
use crate::bundler::error::{Context, ErrorExt, Result};
use crate::bundler::utils::fs::{self, relative_path};
use crate::bundler::utils::process::{CommandRunner, Invocation};
use crate::config::{BuildConfig, PACKAGE_JSON};
use path_absolutize::Absolutize;
use serde_json::{Map, Value};
use std::path::Path;

const LOCAL_PREFIX: &str = "file:";

/// A dependency resolved from the filesystem rather than a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalDependency {
    /// Dependency name as declared
    pub name: String,
    /// Path relative to the workspace, `/`-separated
    pub path: String,
}

/// Local dependencies in declaration order.
pub type LocalDependencies = Vec<LocalDependency>;

/// Stages the base workspace and returns its local dependencies.
pub async fn stage<R: CommandRunner>(config: &BuildConfig, runner: &R) -> Result<LocalDependencies> {
    let workspace = config.workspace(None);
    log::info!("gathering workspace for {} to {}", config.bin, workspace.display());

    let tarball = pack_project(&config.root, runner).await?;
    extract(&tarball, &workspace).await?;
    update_package_json(config, &workspace).await
}

async fn pack_project<R: CommandRunner>(root: &Path, runner: &R) -> Result<std::path::PathBuf> {
    let stdout = runner
        .run(&Invocation::new("npm", root).args(["pack", "--unsafe-perm"]))
        .await?;
    let name = stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .context("npm pack did not report a tarball name")?;
    Ok(root.join(name))
}

async fn extract(tarball: &Path, workspace: &Path) -> Result<()> {
    fs::create_dir_all(workspace, true).await?;
    archive::unpack_gzip(tarball, workspace, "package")
        .await
        .with_context(|| format!("extracting {}", tarball.display()))?;
    fs::remove_file(tarball).await?;
    fs::remove_file(&workspace.join("bin").join("run.cmd")).await
}

async fn update_package_json(config: &BuildConfig, workspace: &Path) -> Result<LocalDependencies> {
    let path = workspace.join(PACKAGE_JSON);
    let content = tokio::fs::read_to_string(&path)
        .await
        .fs_context("reading staged package.json", &path)?;
    let mut pjson: Value = serde_json::from_str(&content)?;

    let local = rewrite_package_json(
        &mut pjson,
        &config.version,
        config.update.bucket.as_deref(),
        &config.root,
        workspace,
    )?;

    let mut out = serde_json::to_string_pretty(&pjson)?;
    out.push('\n');
    tokio::fs::write(&path, out)
        .await
        .fs_context("writing staged package.json", &path)?;
    Ok(local)
}

/// Applies the build's metadata to a staged `package.json` document.
///
/// `workspace` and `root` must be absolute.
pub fn rewrite_package_json(
    pjson: &mut Value,
    version: &str,
    bucket: Option<&str>,
    root: &Path,
    workspace: &Path,
) -> Result<LocalDependencies> {
    let doc = pjson
        .as_object_mut()
        .context("staged package.json is not an object")?;
    doc.insert("version".into(), Value::String(version.to_string()));

    let s3 = object_entry(object_entry(object_entry(doc, "oclif")?, "update")?, "s3")?;
    match bucket {
        Some(bucket) => {
            s3.insert("bucket".into(), Value::String(bucket.to_string()));
        }
        None => {
            s3.remove("bucket");
        }
    }

    let Some(dependencies) = doc.get_mut("dependencies").and_then(Value::as_object_mut) else {
        return Ok(Vec::new());
    };

    let mut local = Vec::new();
    for (name, spec) in dependencies.iter_mut() {
        let Some(source) = spec.as_str().and_then(|s| s.strip_prefix(LOCAL_PREFIX)) else {
            continue;
        };
        let joined = root.join(source);
        let resolved = joined
            .absolutize()
            .fs_context("resolving local dependency", &joined)?;
        let path = to_slash(&relative_path(workspace, &resolved));
        *spec = Value::String(format!("{LOCAL_PREFIX}./{path}"));
        local.push(LocalDependency {
            name: name.clone(),
            path,
        });
    }
    Ok(local)
}

fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str) -> Result<&'a mut Map<String, Value>> {
    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| Value::Object(Map::new()));
    if entry.is_null() {
        *entry = Value::Object(Map::new());
    }
    entry
        .as_object_mut()
        .with_context(|| format!("package.json field '{key}' is not an object"))
}

fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
