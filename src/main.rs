//! docstream CLI entry point
//!
//! Parses arguments, runs the command, prints errors to stderr and exits
//! with a non-zero status on failure. All logic lives in the `cli` module.

use docstream::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
