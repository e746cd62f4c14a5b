//! Command line argument parsing and validation.
//!
//! Two commands: `build` produces tarballs and manifests, `pack-macos` wraps
//! the darwin build into a `.pkg`. Flags override the project's package.json.

use crate::bundler::BuildFlags;
use crate::config::BuildOptions;
use crate::error::CliError;
use crate::target::{Platform, Target};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Packs a Node.js CLI into per-platform tarballs with update manifests
#[derive(Parser, Debug)]
#[command(
    name = "kodegen_bundler_tarballs",
    version,
    about = "Pack a Node.js CLI into per-platform tarballs with update manifests",
    long_about = "Pack a Node.js CLI into self-contained tarballs.

Each target tarball embeds its own Node.js runtime. When oclif.update.s3.host
is configured, update manifests are written next to the archives in dist/.

Usage:
  kodegen_bundler_tarballs build
  kodegen_bundler_tarballs build --targets linux-x64,darwin-arm64 --xz
  kodegen_bundler_tarballs pack-macos -r ./my-cli"
)]
pub struct Args {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Print every archive and manifest written
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build tarballs and update manifests
    Build(BuildArgs),
    /// Pack the CLI into a macOS .pkg installer
    PackMacos(PackMacosArgs),
}

/// Arguments of `build`
#[derive(clap::Args, Debug, Clone)]
pub struct BuildArgs {
    /// Path to the CLI project root
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Comma-separated targets, e.g. linux-x64,win32-x86
    #[arg(long, value_delimiter = ',')]
    pub targets: Option<Vec<Target>>,

    /// Also produce .tar.xz archives
    #[arg(long, overrides_with = "no_xz")]
    pub xz: bool,

    /// Do not produce .tar.xz archives
    #[arg(long = "no-xz", overrides_with = "xz")]
    pub no_xz: bool,

    /// Only build targets of this platform (linux, win32, darwin)
    #[arg(long)]
    pub platform: Option<Platform>,

    /// Prepare workspaces without writing archives or manifests
    #[arg(long)]
    pub no_pack: bool,

    /// Version to stamp instead of the one in package.json
    #[arg(long = "next-version", env = "KODEGEN_NEXT_VERSION")]
    pub next_version: Option<String>,
}

/// Arguments of `pack-macos`
#[derive(clap::Args, Debug, Clone)]
pub struct PackMacosArgs {
    /// Path to the CLI project root
    #[arg(short, long, default_value = ".")]
    pub root: PathBuf,

    /// Keychain holding the signing identity
    #[arg(long, env = "OSX_KEYCHAIN")]
    pub keychain: Option<String>,

    /// Version to stamp instead of the one in package.json
    #[arg(long = "next-version", env = "KODEGEN_NEXT_VERSION")]
    pub next_version: Option<String>,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), CliError> {
        let root = match &self.command {
            Command::Build(args) => &args.root,
            Command::PackMacos(args) => &args.root,
        };
        if !root.is_dir() {
            return Err(CliError::InvalidArguments {
                reason: format!("project root {} is not a directory", root.display()),
            });
        }
        Ok(())
    }
}

impl Command {
    /// Command name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Build(_) => "build",
            Self::PackMacos(_) => "pack-macos",
        }
    }
}

impl BuildArgs {
    /// Overrides applied on top of package.json
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            targets: self.targets.clone(),
            xz: match (self.xz, self.no_xz) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            },
            version_override: self.next_version.clone(),
        }
    }

    /// Pipeline switches
    pub fn flags(&self) -> BuildFlags {
        BuildFlags {
            platform: self.platform,
            pack: !self.no_pack,
        }
    }
}

impl PackMacosArgs {
    /// Overrides applied on top of package.json
    pub fn options(&self) -> BuildOptions {
        BuildOptions {
            version_override: self.next_version.clone(),
            ..BuildOptions::default()
        }
    }
}
