//! Spritestage - command-line tool for staging sprite sheet exports

use std::process::ExitCode;

use spritestage::cli;

fn main() -> ExitCode {
    cli::run()
}
