//! `pack-macos`: wraps the darwin build into a `.pkg`.

use crate::bundler::platform::macos;
use crate::bundler::{NodeDistProvider, SystemRunner};
use crate::cli::{OutputManager, PackMacosArgs};
use crate::config::BuildConfig;
use crate::error::Result;
use crate::target::Platform;

/// Builds the macOS installer package.
///
/// Host and identifier checks run before the workspace is touched.
pub async fn execute_pack_macos(args: &PackMacosArgs, output: &OutputManager) -> Result<i32> {
    let config = BuildConfig::load(&args.root, args.options()).await?;
    let settings = macos::preflight(&config, Platform::host(), args.keychain.clone())?;

    output.section(&format!("{} v{} (macOS installer)", config.bin, config.version))?;
    output.progress(&format!("Packaging {}", settings.identifier))?;

    let provider = NodeDistProvider::new(&config.update.runtime_recommended, &config.cache_dir());
    let pkg = macos::wrap(&config, &settings, &provider, &SystemRunner).await?;

    output.success(&format!("Wrote {}", pkg.display()))?;
    Ok(0)
}
