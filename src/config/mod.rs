//! Build configuration.
//!
//! [`ProjectManifest`] is the on-disk view of the packaged project's
//! `package.json`; [`BuildConfig`] is the resolved, read-only configuration
//! handed to every pipeline stage.

mod build;
mod project;

pub use build::{BuildConfig, BuildOptions, Rollout, UpdateConfig};
pub use project::{
    AutoupdateSetting, Engines, MacosSection, NodeSection, OclifSection, PACKAGE_JSON,
    ProjectManifest, RolloutSetting, S3Section, UpdateSection,
};
