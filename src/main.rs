//! Sluice - command-line incremental asset build pipeline

use std::process::ExitCode;

use sluice::cli;

fn main() -> ExitCode {
    cli::run()
}
