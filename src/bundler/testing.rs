//! Fakes and fixtures shared by the pipeline's unit tests.

use crate::bundler::archive;
use crate::bundler::error::{Error, Result};
use crate::bundler::runtime::RuntimeBinaryProvider;
use crate::bundler::utils::process::{CommandRunner, Invocation};
use crate::keys::ArchiveFormat;
use crate::target::Target;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// File name the fake `npm pack` reports.
pub(crate) const PACKED_TARBALL: &str = "mycli-1.0.0.tgz";

/// Records every invocation. `npm pack` produces a real tarball from a
/// fixture directory; everything else succeeds with empty output unless its
/// program was marked failing.
pub(crate) struct RecordingRunner {
    package: Option<PathBuf>,
    failing: Option<String>,
    responses: Vec<(String, String)>,
    calls: Mutex<Vec<Invocation>>,
}

impl RecordingRunner {
    /// Runner whose `npm pack` packs `package` (a directory named `package`).
    pub(crate) fn new(package: &Path) -> Self {
        Self {
            package: Some(package.to_path_buf()),
            failing: None,
            responses: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Runner that never produces files.
    pub(crate) fn idle() -> Self {
        Self {
            package: None,
            failing: None,
            responses: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Makes every invocation of `program` exit unsuccessfully.
    pub(crate) fn failing(mut self, program: &str) -> Self {
        self.failing = Some(program.to_string());
        self
    }

    /// Makes `program` print `stdout`.
    pub(crate) fn responding(mut self, program: &str, stdout: &str) -> Self {
        self.responses.push((program.to_string(), stdout.to_string()));
        self
    }

    /// Invocations so far, in order.
    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl CommandRunner for RecordingRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(invocation.clone());

        if self.failing.as_deref() == Some(invocation.program.as_str()) {
            return Err(Error::ProcessFailed {
                command: invocation.command_line(),
                status: "exit status: 1".into(),
                stderr: "simulated failure".into(),
            });
        }

        if let Some((_, stdout)) = self
            .responses
            .iter()
            .find(|(program, _)| *program == invocation.program)
        {
            return Ok(stdout.clone());
        }

        let is_pack = invocation.program == "npm"
            && invocation.args.first().map(String::as_str) == Some("pack");
        match (&self.package, is_pack) {
            (Some(package), true) => {
                archive::pack(package, &invocation.cwd.join(PACKED_TARBALL), ArchiveFormat::Gzip)
                    .await?;
                Ok(format!("npm notice package size: 1 kB\n{PACKED_TARBALL}\n"))
            }
            _ => Ok(String::new()),
        }
    }
}

/// Writes a marker file instead of downloading a runtime.
#[derive(Default)]
pub(crate) struct FakeRuntime {
    provided: Mutex<Vec<Target>>,
}

impl FakeRuntime {
    /// Targets provided so far, in order.
    pub(crate) fn provided(&self) -> Vec<Target> {
        self.provided.lock().expect("provided lock").clone()
    }
}

impl RuntimeBinaryProvider for FakeRuntime {
    async fn provide(&self, target: Target, dest: &Path) -> Result<()> {
        self.provided.lock().expect("provided lock").push(target);
        crate::bundler::utils::fs::write_executable(dest, &format!("runtime for {target}")).await
    }
}

/// A project on disk plus the directory the fake `npm pack` archives.
pub(crate) struct Fixture {
    /// Project root containing package.json and package-lock.json
    pub root: PathBuf,
    /// Contents of the packed tarball, as a directory named `package`
    pub package: PathBuf,
}

/// Project `mycli@1.0.0` with bucket `my-bucket`, no host, and `dependencies`
/// given as a JSON object literal.
pub(crate) fn fixture_project(dir: &Path, dependencies: &str) -> Fixture {
    fixture_project_with(dir, dependencies, json!({"s3": {"bucket": "my-bucket"}}), None)
}

/// Project with a custom `oclif.update` section and optional `oclif.macos`.
///
/// `oclif.update.node.version` defaults to `20.11.1` so loading the config
/// never queries the host runtime.
pub(crate) fn fixture_project_with(
    dir: &Path,
    dependencies: &str,
    mut update: Value,
    macos: Option<Value>,
) -> Fixture {
    let root = dir.join("mycli");
    let package = dir.join("pack").join("package");
    std::fs::create_dir_all(&root).expect("mkdir root");
    std::fs::create_dir_all(package.join("bin")).expect("mkdir package/bin");
    std::fs::create_dir_all(package.join("lib")).expect("mkdir package/lib");

    let update_obj = update.as_object_mut().expect("update is an object");
    update_obj
        .entry("node")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .expect("node is an object")
        .entry("version")
        .or_insert_with(|| json!("20.11.1"));

    let mut oclif = json!({"bin": "mycli", "update": update});
    if let Some(macos) = macos {
        oclif["macos"] = macos;
    }
    let deps: Value = serde_json::from_str(dependencies).expect("dependencies json");
    let pjson = json!({
        "name": "mycli",
        "version": "1.0.0",
        "engines": {"node": ">=18.0.0"},
        "dependencies": deps,
        "oclif": oclif,
    });
    let pjson = serde_json::to_string_pretty(&pjson).expect("serialize");

    std::fs::write(root.join("package.json"), &pjson).expect("write package.json");
    std::fs::write(root.join("package-lock.json"), "{}").expect("write lockfile");

    std::fs::write(package.join("package.json"), &pjson).expect("write package.json");
    std::fs::write(package.join("bin/run"), "#!/usr/bin/env node\nrequire('../lib')\n")
        .expect("write bin/run");
    std::fs::write(package.join("bin/run.cmd"), "@echo off\r\nnode \"%~dp0\\run\" %*\r\n")
        .expect("write bin/run.cmd");
    std::fs::write(package.join("lib/index.js"), "module.exports = {}\n").expect("write lib");

    Fixture { root, package }
}
