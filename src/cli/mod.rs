//! CLI module for flexindex
//!
//! Provides command-line access to one configured directory:
//! - reconcile: bring the index file up to date
//! - list: print the index, re-keyed and sorted
//! - call: run a registered operation through the method cache

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{call, list, reconcile, render, run_command};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{print_response, write_error, write_response};

/// Parse arguments and run the selected command.
///
/// Failures are also written to stdout as an error response so scripted
/// callers always get one JSON line.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    let result = run_command(cli.command);
    if let Err(e) = &result {
        let _ = write_error(&mut std::io::stdout().lock(), e.code_str(), e.message());
    }
    result
}
