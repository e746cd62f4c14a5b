//! External process execution.
//!
//! Every invocation carries its own working directory; nothing in the crate
//! changes the process-wide current directory, so independent invocations
//! can run side by side.

use crate::bundler::error::{Error, Result};
use std::future::Future;
use std::path::{Path, PathBuf};

/// One external command: program, arguments and working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, resolved on PATH at run time
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub cwd: PathBuf,
}

impl Invocation {
    /// Creates an invocation of `program` inside `cwd`.
    pub fn new(program: impl Into<String>, cwd: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: cwd.as_ref().to_path_buf(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Command line as a single string, for logs and errors.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Runs external commands.
///
/// Implemented by [`SystemRunner`] for real builds and by recording fakes in
/// tests.
pub trait CommandRunner: Send + Sync {
    /// Runs `invocation` to completion and returns its stdout.
    ///
    /// A non-zero exit status is an error.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<String>> + Send;
}

/// Runs commands on the host with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        let program = which::which(&invocation.program).map_err(|_| Error::ToolNotFound {
            tool: invocation.program.clone(),
        })?;

        log::debug!(
            "running `{}` in {}",
            invocation.command_line(),
            invocation.cwd.display()
        );

        let output = tokio::process::Command::new(&program)
            .args(&invocation.args)
            .current_dir(&invocation.cwd)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|error| Error::CommandFailed {
                command: invocation.command_line(),
                error,
            })?;

        if !output.status.success() {
            return Err(Error::ProcessFailed {
                command: invocation.command_line(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Locates a required tool on PATH.
pub fn require_tool(tool: &str) -> Result<PathBuf> {
    which::which(tool).map_err(|_| Error::ToolNotFound {
        tool: tool.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let inv = Invocation::new("npm", "/tmp")
            .arg("install")
            .args(["--production"]);
        assert_eq!(inv.command_line(), "npm install --production");
        assert_eq!(inv.cwd, PathBuf::from("/tmp"));
    }

    #[tokio::test]
    async fn missing_tool_is_reported() {
        let inv = Invocation::new("definitely-not-a-real-tool-4242", ".");
        let err = SystemRunner.run(&inv).await.expect_err("tool is missing");
        assert!(matches!(err, Error::ToolNotFound { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_explicit_working_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cwd = tmp.path().canonicalize().expect("canonical");
        let out = SystemRunner
            .run(&Invocation::new("pwd", &cwd))
            .await
            .expect("pwd runs");
        assert_eq!(PathBuf::from(out.trim()), cwd);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_an_error() {
        let err = SystemRunner
            .run(&Invocation::new("false", "."))
            .await
            .expect_err("false fails");
        assert!(matches!(err, Error::ProcessFailed { .. }));
    }
}
