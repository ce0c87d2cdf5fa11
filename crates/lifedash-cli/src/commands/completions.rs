use clap::CommandFactory;
use clap_complete::{generate, Shell};

use super::CliResult;
use crate::Cli;

pub fn run(shell: Shell) -> CliResult {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "lifedash", &mut std::io::stdout());
    Ok(())
}
