//! `.pkg` installer wrapping with `pkgbuild`.
//!
//! The darwin-x64 workspace becomes the package payload. Three lifecycle
//! scripts are rendered: `preinstall` and `postinstall` run by the macOS
//! installer, and `uninstall`, shipped inside the installed `bin` directory.

use crate::bundler::builder::{self, BuildFlags};
use crate::bundler::error::Result;
use crate::bundler::runtime::RuntimeBinaryProvider;
use crate::bundler::utils::fs;
use crate::bundler::utils::process::{CommandRunner, Invocation};
use crate::config::BuildConfig;
use crate::error::{ConfigError, HostError};
use crate::target::{Arch, Platform, Target};
use handlebars::Handlebars;
use std::{collections::BTreeMap, path::Path, path::PathBuf};

/// Directory the package installs under.
pub const INSTALL_ROOT: &str = "/usr/local/lib";

/// Target whose workspace becomes the package payload.
pub const PAYLOAD_TARGET: Target = Target::new(Platform::Darwin, Arch::X64);

const PREINSTALL: &str = r#"#!/usr/bin/env bash
sudo rm -rf {{install_root}}/{{dirname}}
sudo rm -rf /usr/local/{{bin}}
sudo rm -rf /usr/local/bin/{{bin}}
"#;

const POSTINSTALL: &str = r#"#!/usr/bin/env bash
set -x
sudo mkdir -p /usr/local/bin
sudo ln -sf {{install_root}}/{{dirname}}/bin/{{bin}} /usr/local/bin/{{bin}}
"#;

const UNINSTALL: &str = r#"#!/usr/bin/env bash

DATE=`date +%Y-%m-%d`
TIME=`date +%H:%M:%S`
LOG_PREFIX="[$DATE $TIME]"

log_info() {
    echo "${LOG_PREFIX}[INFO]" $1
}

log_warn() {
    echo "${LOG_PREFIX}[WARN]" $1
}

log_error() {
    echo "${LOG_PREFIX}[ERROR]" $1
}

if (( $EUID != 0 )); then
    echo "Please run as root."
    exit
fi

echo "Welcome to Application Uninstaller"
echo "The following packages will be REMOVED:"
echo "  {{dirname}}"
while [ "$1" != "-y" ]; do
    read -p "Do you wish to continue [Y/n]?" answer
    [[ $answer == "y" || $answer == "Y" || $answer == "" ]] && break
    [[ $answer == "n" || $answer == "N" ]] && exit 0
    echo "Please answer with 'y' or 'n'"
done

echo "Application uninstalling process started"

# every step runs even if an earlier one failed
find "/usr/local/bin/" -name "{{bin}}" | xargs rm
if [ $? -eq 0 ]
then
  echo "[1/3] [DONE] Successfully deleted shortcut links"
else
  echo "[1/3] [ERROR] Could not delete shortcut links" >&2
fi

pkgutil --forget "{{identifier}}" > /dev/null 2>&1
if [ $? -eq 0 ]
then
  echo "[2/3] [DONE] Successfully deleted application informations"
else
  echo "[2/3] [ERROR] Could not delete application informations" >&2
fi

[ -e "{{install_root}}/{{dirname}}" ] && rm -rf "{{install_root}}/{{dirname}}"
if [ $? -eq 0 ]
then
  echo "[3/3] [DONE] Successfully deleted application"
else
  echo "[3/3] [ERROR] Could not delete application" >&2
fi

echo "Application uninstall process finished"
exit 0
"#;

/// Installer settings, validated before anything touches the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgSettings {
    /// Package identifier, e.g. `com.example.mycli`
    pub identifier: String,
    /// Signing identity for `pkgbuild --sign`
    pub sign: Option<String>,
    /// Keychain for `pkgbuild --keychain`
    pub keychain: Option<String>,
}

/// Rendered lifecycle scripts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgScripts {
    /// Runs before installation
    pub preinstall: String,
    /// Runs after installation
    pub postinstall: String,
    /// Shipped as `bin/uninstall`
    pub uninstall: String,
}

/// Checks that wrapping can run: the host must be macOS and
/// `oclif.macos.identifier` must be set, in that order.
///
/// `host` is normally [`Platform::host`].
pub fn preflight(
    config: &BuildConfig,
    host: Option<Platform>,
    keychain: Option<String>,
) -> crate::Result<PkgSettings> {
    if host != Some(Platform::Darwin) {
        return Err(HostError::WrongHost {
            expected: "macos",
            found: host.map_or_else(|| std::env::consts::OS.to_string(), |p| p.to_string()),
        }
        .into());
    }

    let macos = config.macos.as_ref();
    let identifier = macos
        .and_then(|m| m.identifier.clone())
        .filter(|id| !id.trim().is_empty())
        .ok_or(ConfigError::MissingInstallerIdentifier)?;

    Ok(PkgSettings {
        identifier,
        sign: macos.and_then(|m| m.sign.clone()),
        keychain: keychain.filter(|k| !k.is_empty()),
    })
}

/// Renders the lifecycle scripts for `config`.
pub fn render_scripts(config: &BuildConfig, identifier: &str) -> Result<PkgScripts> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    for (name, template) in [
        ("preinstall", PREINSTALL),
        ("postinstall", POSTINSTALL),
        ("uninstall", UNINSTALL),
    ] {
        handlebars.register_template_string(name, template)?;
    }

    let mut data = BTreeMap::new();
    data.insert("bin", config.bin.as_str());
    data.insert("dirname", config.dirname.as_str());
    data.insert("identifier", identifier);
    data.insert("install_root", INSTALL_ROOT);

    Ok(PkgScripts {
        preinstall: handlebars.render("preinstall", &data)?,
        postinstall: handlebars.render("postinstall", &data)?,
        uninstall: handlebars.render("uninstall", &data)?,
    })
}

/// Where the package is written.
pub fn output_path(config: &BuildConfig) -> PathBuf {
    config.dist_path(&format!("macos/{}-v{}.pkg", config.bin, config.version))
}

/// The `pkgbuild` command for the given payload and scripts.
pub fn pkgbuild(
    config: &BuildConfig,
    settings: &PkgSettings,
    payload: &Path,
    scripts: &Path,
    output: &Path,
) -> Invocation {
    let mut invocation = Invocation::new("pkgbuild", &config.root).args([
        "--root".to_string(),
        payload.display().to_string(),
        "--identifier".to_string(),
        settings.identifier.clone(),
        "--version".to_string(),
        config.version.clone(),
        "--install-location".to_string(),
        format!("{INSTALL_ROOT}/{}", config.dirname),
        "--scripts".to_string(),
        scripts.display().to_string(),
    ]);
    if let Some(sign) = &settings.sign {
        invocation = invocation.arg("--sign").arg(sign.as_str());
    }
    if let Some(keychain) = &settings.keychain {
        invocation = invocation.arg("--keychain").arg(keychain.as_str());
    }
    invocation.arg(output.display().to_string())
}

/// Builds the darwin-x64 workspace (without archives) and wraps it into a `.pkg`.
///
/// Call [`preflight`] first.
pub async fn wrap<P, R>(
    config: &BuildConfig,
    settings: &PkgSettings,
    provider: &P,
    runner: &R,
) -> Result<PathBuf>
where
    P: RuntimeBinaryProvider,
    R: CommandRunner,
{
    let mut payload_config = config.clone();
    payload_config.targets = vec![PAYLOAD_TARGET];
    let flags = BuildFlags {
        platform: Some(Platform::Darwin),
        pack: false,
    };
    builder::build(&payload_config, flags, provider, runner).await?;

    let output = output_path(config);
    if let Some(dir) = output.parent() {
        fs::create_dir_all(dir, true).await?;
    }

    let scripts_dir = config.tmp.join("macos").join("scripts");
    let payload = config.workspace(Some(PAYLOAD_TARGET));
    let scripts = render_scripts(config, &settings.identifier)?;
    fs::write_executable(&scripts_dir.join("preinstall"), &scripts.preinstall).await?;
    fs::write_executable(&scripts_dir.join("postinstall"), &scripts.postinstall).await?;
    fs::write_executable(&payload.join("bin").join("uninstall"), &scripts.uninstall).await?;

    log::info!("building installer {}", output.display());
    runner
        .run(&pkgbuild(config, settings, &payload, &scripts_dir, &output))
        .await?;
    Ok(output)
}
