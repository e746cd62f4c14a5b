//! Platform/architecture pairs that tarballs are built for.
//!
//! Targets are written as `{platform}-{arch}` (for example `linux-x64`), the
//! same identifiers Node.js uses for `process.platform` and `process.arch`.
//! Parsing is strict: an unknown platform, an unknown architecture or an
//! unsupported combination is rejected before any path is built from it.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Operating system family of a target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Platform {
    /// Linux
    Linux,
    /// Windows
    Win32,
    /// macOS
    Darwin,
}

impl Platform {
    /// Returns the lowercase identifier used in keys and workspace paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Win32 => "win32",
            Self::Darwin => "darwin",
        }
    }

    /// Platform of the machine running the build, if it is one we package for.
    pub fn host() -> Option<Self> {
        match std::env::consts::OS {
            "linux" => Some(Self::Linux),
            "windows" => Some(Self::Win32),
            "macos" => Some(Self::Darwin),
            _ => None,
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "linux" => Ok(Self::Linux),
            "win32" => Ok(Self::Win32),
            "darwin" => Ok(Self::Darwin),
            other => Err(ParseTargetError::UnknownPlatform(other.to_string())),
        }
    }
}

/// CPU architecture of a target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum Arch {
    /// x86_64
    X64,
    /// 32-bit x86
    X86,
    /// 32-bit ARM (armv7l)
    Arm,
    /// AArch64
    Arm64,
}

impl Arch {
    /// Returns the lowercase identifier used in keys and workspace paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "x86",
            Self::Arm => "arm",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "x64" => Ok(Self::X64),
            "x86" => Ok(Self::X86),
            "arm" => Ok(Self::Arm),
            "arm64" => Ok(Self::Arm64),
            other => Err(ParseTargetError::UnknownArch(other.to_string())),
        }
    }
}

/// Errors produced while parsing a `{platform}-{arch}` identifier.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseTargetError {
    /// Identifier is not of the form `platform-arch`
    #[error("malformed target '{0}', expected <platform>-<arch> (e.g. linux-x64)")]
    Malformed(String),

    /// Platform half is not supported
    #[error("unknown platform '{0}' (supported: linux, win32, darwin)")]
    UnknownPlatform(String),

    /// Architecture half is not supported
    #[error("unknown architecture '{0}' (supported: x64, x86, arm, arm64)")]
    UnknownArch(String),

    /// Both halves parse but the pair is not buildable
    #[error("unsupported target combination '{0}'")]
    Unsupported(String),
}

/// A (platform, architecture) pair.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct Target {
    /// Operating system family
    pub platform: Platform,
    /// CPU architecture
    pub arch: Arch,
}

/// Targets built when neither the CLI nor the project configuration names any.
pub const DEFAULT_TARGETS: [Target; 5] = [
    Target::new(Platform::Linux, Arch::X64),
    Target::new(Platform::Linux, Arch::Arm),
    Target::new(Platform::Win32, Arch::X64),
    Target::new(Platform::Win32, Arch::X86),
    Target::new(Platform::Darwin, Arch::X64),
];

impl Target {
    /// Creates a target without validating the combination.
    pub const fn new(platform: Platform, arch: Arch) -> Self {
        Self { platform, arch }
    }

    /// Whether a runtime binary can exist for this pair.
    pub fn is_supported(&self) -> bool {
        !matches!(
            (self.platform, self.arch),
            (Platform::Darwin, Arch::X86) | (Platform::Darwin, Arch::Arm) | (Platform::Win32, Arch::Arm)
        )
    }

    /// Parses a list of identifiers, skipping blanks.
    pub fn parse_list<I, S>(items: I) -> Result<Vec<Target>, ParseTargetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        items
            .into_iter()
            .filter(|s| !s.as_ref().trim().is_empty())
            .map(|s| s.as_ref().trim().parse())
            .collect()
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.platform, self.arch)
    }
}

impl FromStr for Target {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (platform, arch) = s
            .split_once('-')
            .ok_or_else(|| ParseTargetError::Malformed(s.to_string()))?;
        let target = Target::new(platform.parse()?, arch.parse()?);
        if !target.is_supported() {
            return Err(ParseTargetError::Unsupported(s.to_string()));
        }
        Ok(target)
    }
}
