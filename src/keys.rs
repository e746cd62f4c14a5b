//! Storage key scheme shared with the autoupdate client.
//!
//! Keys are `{channel}/{bin}[/{platform}-{arch}]/{artifact}`. They are a pure
//! function of (bin, channel, version, target): the update client derives the
//! same strings independently, so nothing here may read the filesystem or the
//! clock.

use crate::target::Target;

/// Archive flavour of a versioned tarball.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ArchiveFormat {
    /// `.tar.gz`
    Gzip,
    /// `.tar.xz`
    Xz,
}

impl ArchiveFormat {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => ".tar.gz",
            Self::Xz => ".tar.xz",
        }
    }
}

/// What a key points at.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum KeyKind {
    /// Directory that groups everything for one channel (and target)
    BaseDir,
    /// Versioned archive file under the base directory
    Versioned(ArchiveFormat),
    /// Update manifest under the base directory
    Manifest,
}

/// File name of the update manifest inside a base directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Resolver for the key scheme of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScheme {
    bin: String,
    channel: String,
    version: String,
}

impl KeyScheme {
    /// Creates a resolver for `bin` published on `channel` at `version`.
    pub fn new(bin: impl Into<String>, channel: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            bin: bin.into(),
            channel: channel.into(),
            version: version.into(),
        }
    }

    /// Release channel.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Resolved version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resolves a key. `target` of `None` addresses the base (host platform) build.
    pub fn resolve(&self, kind: KeyKind, target: Option<Target>) -> String {
        let base_dir = match target {
            Some(t) => format!("{}/{}/{}", self.channel, self.bin, t),
            None => format!("{}/{}", self.channel, self.bin),
        };

        match kind {
            KeyKind::BaseDir => base_dir,
            KeyKind::Versioned(format) => {
                let suffix = target.map(|t| format!("-{t}")).unwrap_or_default();
                format!(
                    "{base_dir}/{}-v{}{suffix}{}",
                    self.bin,
                    self.version,
                    format.extension()
                )
            }
            KeyKind::Manifest => format!("{base_dir}/{MANIFEST_FILE}"),
        }
    }

    /// Public URL of `key` under `host`.
    pub fn url(host: &str, key: &str) -> String {
        format!("{}/{}", host.trim_end_matches('/'), key.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DEFAULT_TARGETS;
    use std::collections::HashSet;

    fn scheme() -> KeyScheme {
        KeyScheme::new("mycli", "stable", "1.2.3")
    }

    #[test]
    fn base_keys_have_no_target_segment() {
        let s = scheme();
        assert_eq!(s.resolve(KeyKind::BaseDir, None), "stable/mycli");
        assert_eq!(
            s.resolve(KeyKind::Versioned(ArchiveFormat::Gzip), None),
            "stable/mycli/mycli-v1.2.3.tar.gz"
        );
        assert_eq!(s.resolve(KeyKind::Manifest, None), "stable/mycli/manifest.json");
    }

    #[test]
    fn target_keys_are_namespaced_by_platform_arch() {
        let s = scheme();
        let t = "linux-x64".parse().expect("valid target");
        assert_eq!(s.resolve(KeyKind::BaseDir, Some(t)), "stable/mycli/linux-x64");
        assert_eq!(
            s.resolve(KeyKind::Versioned(ArchiveFormat::Xz), Some(t)),
            "stable/mycli/linux-x64/mycli-v1.2.3-linux-x64.tar.xz"
        );
        assert_eq!(
            s.resolve(KeyKind::Manifest, Some(t)),
            "stable/mycli/linux-x64/manifest.json"
        );
    }

    #[test]
    fn resolve_is_deterministic() {
        let a = scheme();
        let b = scheme();
        for target in DEFAULT_TARGETS.iter().copied().map(Some).chain([None]) {
            for kind in [
                KeyKind::BaseDir,
                KeyKind::Manifest,
                KeyKind::Versioned(ArchiveFormat::Gzip),
                KeyKind::Versioned(ArchiveFormat::Xz),
            ] {
                assert_eq!(a.resolve(kind, target), b.resolve(kind, target));
            }
        }
    }

    #[test]
    fn distinct_targets_never_collide() {
        let s = scheme();
        for kind in [
            KeyKind::BaseDir,
            KeyKind::Manifest,
            KeyKind::Versioned(ArchiveFormat::Gzip),
        ] {
            let keys: HashSet<_> = DEFAULT_TARGETS
                .iter()
                .map(|t| s.resolve(kind, Some(*t)))
                .chain([s.resolve(kind, None)])
                .collect();
            assert_eq!(keys.len(), DEFAULT_TARGETS.len() + 1);
        }
    }

    #[test]
    fn url_joins_with_single_slash() {
        assert_eq!(
            KeyScheme::url("https://cdn.example.com/", "stable/mycli/manifest.json"),
            "https://cdn.example.com/stable/mycli/manifest.json"
        );
        assert_eq!(
            KeyScheme::url("https://cdn.example.com", "stable/mycli"),
            "https://cdn.example.com/stable/mycli"
        );
    }
}
