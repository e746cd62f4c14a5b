//! Command line interface for kodegen_bundler_tarballs.
//!
//! Parses arguments, runs the selected command and reports progress with
//! colored output.

mod args;
pub mod commands;
mod output;

pub use args::{Args, BuildArgs, Command, PackMacosArgs};
pub use commands::execute_command;
pub use output::OutputManager;

use crate::error::Result;

/// Main CLI entry point
pub async fn run() -> Result<i32> {
    let args = Args::parse_args();
    execute_command(args).await
}
