//! CLI command implementations
//!
//! Both commands build the same pipeline over an in-memory table named
//! `input`:
//!
//! ```text
//! TableScan("input") | [TempTreeSort(key)] | GroupAggregate(key|NULL, aggs...)
//! ```

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use crate::config::ExecutionConfig;
use crate::environment::Environment;
use crate::expr::functions::{Avg, Count, Max, Min, Sum};
use crate::expr::{AggregatorBuilder, Expr};
use crate::observability::Logger;
use crate::storage::MemoryStore;
use crate::stream::{Flow, Stream, TableScan};

use super::args::{Cli, Command, QueryArgs};
use super::errors::{CliError, CliResult};
use super::io::{open_input, read_documents, write_document};

/// Table holding the input documents
pub const INPUT_TABLE: &str = "input";

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run a parsed command against stdin/stdout
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Aggregate(args) => {
            let config = load_config(&args)?;
            Logger::set_min_severity(config.severity()?);

            let input = open_input(&args.input)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            aggregate(&args, &config, input, &mut out)?;
            out.flush()?;
            Ok(())
        }
        Command::Explain(args) => {
            let config = load_config(&args)?;
            let mut out = io::stdout();
            writeln!(out, "{}", explain(&args, &config)?)?;
            Ok(())
        }
    }
}

fn load_config(args: &QueryArgs) -> CliResult<ExecutionConfig> {
    match &args.config {
        Some(path) => Ok(ExecutionConfig::load(path)?),
        None => Ok(ExecutionConfig::default()),
    }
}

/// Parses `<func>:<arg>`. `*` is only accepted by `count`.
pub fn parse_aggregate(spec: &str) -> CliResult<Box<dyn AggregatorBuilder>> {
    let (func, arg) = spec.split_once(':').ok_or_else(|| {
        CliError::invalid_argument(format!("aggregate '{}' must be <func>:<arg>", spec))
    })?;

    let func = func.trim().to_ascii_lowercase();
    let arg = arg.trim();

    if arg == "*" {
        return match func.as_str() {
            "count" => Ok(Box::new(Count::wildcard())),
            _ => Err(CliError::invalid_argument(format!(
                "'*' is only valid for count, got '{}'",
                spec
            ))),
        };
    }

    let expr = Expr::parse_path(arg)?;
    match func.as_str() {
        "count" => Ok(Box::new(Count::of(expr))),
        "avg" => Ok(Box::new(Avg::of(expr))),
        "sum" => Ok(Box::new(Sum::of(expr))),
        "min" => Ok(Box::new(Min::of(expr))),
        "max" => Ok(Box::new(Max::of(expr))),
        other => Err(CliError::invalid_argument(format!(
            "unknown aggregate function '{}'",
            other
        ))),
    }
}

/// Builds the pipeline described by `args`
pub fn build_stream(args: &QueryArgs, config: &ExecutionConfig) -> CliResult<Stream> {
    let group_by = args
        .group_by
        .as_deref()
        .map(Expr::parse_path)
        .transpose()?;

    let builders = args
        .aggs
        .iter()
        .map(|spec| parse_aggregate(spec))
        .collect::<CliResult<Vec<_>>>()?;

    // Output fields are named by these labels; a repeated name would
    // overwrite an earlier field
    let mut names: HashSet<String> = group_by.iter().map(|e| e.to_string()).collect();
    for builder in &builders {
        let label = builder.label();
        if !names.insert(label.clone()) {
            return Err(CliError::invalid_argument(format!(
                "output field '{}' is produced more than once",
                label
            )));
        }
    }

    Ok(Stream::new(TableScan::new(INPUT_TABLE)).group_aggregate_with(
        group_by,
        builders,
        config.sort_config(),
    ))
}

/// Renders the pipeline without reading any input
pub fn explain(args: &QueryArgs, config: &ExecutionConfig) -> CliResult<String> {
    Ok(build_stream(args, config)?.to_string())
}

/// Loads `input` into a table, runs the pipeline and writes the results
pub fn aggregate(
    args: &QueryArgs,
    config: &ExecutionConfig,
    input: impl BufRead,
    out: &mut impl Write,
) -> CliResult<()> {
    let stream = build_stream(args, config)?;

    let mut store = MemoryStore::new();
    store.create_table(INPUT_TABLE);
    for doc in read_documents(input)? {
        store.insert(INPUT_TABLE, doc)?;
    }

    let tx = store.begin();
    let catalog = store.catalog();
    let env = Environment::new().with_transaction(&tx).with_catalog(&catalog);

    let mut write_error = None;
    stream.iterate(&env, |row| {
        if let Some(doc) = row.document() {
            if let Err(e) = write_document(&mut *out, doc) {
                write_error = Some(e);
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    })?;

    match write_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
