//! Command-line interface
//!
//! - aggregate: group and aggregate JSON lines from a file or stdin
//! - explain: print the pipeline an aggregate command would run

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command, QueryArgs};
pub use commands::{aggregate, build_stream, explain, parse_aggregate, run, run_command, INPUT_TABLE};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_documents, write_document};
