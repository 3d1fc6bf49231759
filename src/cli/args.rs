//! CLI argument definitions using clap
//!
//! Commands:
//! - docstream aggregate --input <file|-> [--group-by <path>] [--agg <func:arg>]...
//! - docstream explain   (same arguments, prints the pipeline)

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// docstream - streaming grouped aggregation over JSON documents
#[derive(Parser, Debug)]
#[command(name = "docstream")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Aggregate JSON documents and print one result document per line
    Aggregate(QueryArgs),

    /// Print the pipeline that `aggregate` would run
    Explain(QueryArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// JSON lines input file, `-` for stdin
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Path to configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Grouping path, e.g. `a` or `a.b[0]`
    #[arg(long)]
    pub group_by: Option<String>,

    /// Aggregate as `<func>:<path>`, e.g. `count:*`, `avg:a.b`
    #[arg(long = "agg", value_name = "FUNC:ARG")]
    pub aggs: Vec<String>,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
