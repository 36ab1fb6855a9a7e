use std::io;

use anyhow::Result;
use clap_complete::{Shell, generate};

/// Print a completion script for the given shell to stdout.
pub fn handle_completions(shell: Shell) -> Result<()> {
    let mut command = crate::cli_command();
    let bin = command.get_name().to_string();
    generate(shell, &mut command, bin, &mut io::stdout());
    Ok(())
}
