//! `build`: tarballs and update manifests for every target.

use crate::bundler::{self, NodeDistProvider, SystemRunner};
use crate::cli::{BuildArgs, OutputManager};
use crate::config::BuildConfig;
use crate::error::Result;

/// Runs the tarball pipeline.
pub async fn execute_build(args: &BuildArgs, output: &OutputManager) -> Result<i32> {
    let config = BuildConfig::load(&args.root, args.options()).await?;
    output.section(&format!(
        "{} v{} ({})",
        config.bin, config.version, config.channel
    ))?;

    let targets: Vec<String> = config.targets.iter().map(ToString::to_string).collect();
    output.progress(&format!("Building targets: {}", targets.join(", ")))?;

    let provider = NodeDistProvider::new(&config.update.runtime_recommended, &config.cache_dir());
    let report = bundler::build(&config, args.flags(), &provider, &SystemRunner).await?;

    for warning in &report.warnings {
        output.warn(warning)?;
    }
    for archive in &report.archives {
        output.artifact(&config.root, &archive.path)?;
    }
    for manifest in &report.manifests {
        output.artifact(&config.root, manifest)?;
    }

    output.success(&format!(
        "Built {} archive(s) and {} manifest(s) in {}",
        report.archives.len(),
        report.manifests.len(),
        config.dist.display()
    ))?;
    Ok(0)
}
