//! flexindex CLI entry point
//!
//! Parses arguments and dispatches through `cli::run`; everything else
//! lives in the library.

use flexindex::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
