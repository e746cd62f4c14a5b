//! Command execution.

mod build;
mod pack_macos;

use crate::cli::{Args, Command, OutputManager};
use crate::error::Result;

pub use build::execute_build;
pub use pack_macos::execute_pack_macos;

/// Execute the command selected by `args`, returning the process exit code
pub async fn execute_command(args: Args) -> Result<i32> {
    args.validate()?;
    let output = OutputManager::new(args.verbose, args.quiet);

    log::debug!("running command '{}'", args.command.name());
    match &args.command {
        Command::Build(build) => execute_build(build, &output).await,
        Command::PackMacos(pack) => execute_pack_macos(pack, &output).await,
    }
}
