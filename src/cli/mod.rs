mod commands;
pub mod exit_codes;
pub mod output;

pub use commands::Cli;

use anyhow::Result;

/// run the command and return the process exit code
pub fn run(cli: Cli) -> Result<i32> {
    commands::execute(cli)
}
