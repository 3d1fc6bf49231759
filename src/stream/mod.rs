//! Streaming operator pipeline
//!
//! A [`Stream`] is a chain of [`Operator`] stages. Each stage exclusively
//! owns its upstream stage, so the chain is a singly linked list with the
//! source at the tail.
//!
//! # Iteration
//!
//! Iteration is push-based and synchronous. [`Operator::iterate`] receives a
//! continuation and calls it once per produced row with an environment
//! holding that row. The continuation answers with [`Flow::Continue`],
//! [`Flow::Stop`] or an error:
//!
//! - `Stop` ends iteration early. It is not an error.
//! - An error aborts iteration and is returned unchanged.
//!
//! In both cases the stage stops producing rows immediately and never calls
//! the continuation again.
//!
//! The `Flow` returned by `iterate` only reports whether the stage ended
//! early. Stages that buffer rows (sorting, grouping) keep track of whether
//! their own continuation asked to stop instead of inferring it from the
//! flow their upstream returns: an upstream `Take` also ends early.
//!
//! # Stages
//!
//! | Stage              | Kind      | Rendering                       |
//! |--------------------|-----------|---------------------------------|
//! | [`TableScan`]      | source    | `TableScan("t")`                |
//! | [`docs::Emit`]     | source    | `Emit({"a": 1}, ...)`           |
//! | [`docs::Filter`]   | row       | `Filter(a > 1)`                 |
//! | [`docs::Project`]  | row       | `Project(a, b + 1 AS c)`        |
//! | [`docs::Skip`]     | row       | `Skip(10)`                      |
//! | [`docs::Take`]     | row       | `Take(10)`                      |
//! | [`docs::TempTreeSort`]   | buffering | `TempTreeSort(a % 2)`     |
//! | [`docs::GroupAggregate`] | buffering | `GroupAggregate(a % 2, COUNT(*))` |

pub mod docs;
mod errors;
mod table;
pub mod temp_tree;

pub use errors::{StreamError, StreamResult};
pub use table::TableScan;
pub use temp_tree::SortConfig;

use std::fmt;

use crate::environment::Environment;
use crate::expr::{AggregatorBuilder, Expr};
use crate::observability::Logger;
use crate::types::Document;

/// Answer of a continuation, and outcome of an iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep producing rows
    Continue,
    /// Stop producing rows
    Stop,
}

/// Continuation called once per produced row
pub type Continuation<'f> = dyn FnMut(&Environment<'_>) -> StreamResult<Flow> + 'f;

/// One stage of the pipeline
pub trait Operator: fmt::Display {
    /// Produces rows, calling `f` once per row.
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow>;

    /// Attaches the upstream stage. Sources discard it.
    fn set_prev(&mut self, prev: Box<dyn Operator>);

    /// Upstream stage, if any
    fn prev(&self) -> Option<&dyn Operator>;
}

/// A pipeline of stages, ending at its last stage
pub struct Stream {
    op: Box<dyn Operator>,
}

impl Stream {
    /// Starts a stream at a source stage
    pub fn new(source: impl Operator + 'static) -> Self {
        Self {
            op: Box::new(source),
        }
    }

    /// Appends a stage consuming the rows of this stream
    pub fn pipe(self, mut op: impl Operator + 'static) -> Self {
        op.set_prev(self.op);
        Self { op: Box::new(op) }
    }

    /// Appends grouped aggregation.
    ///
    /// Grouping needs equal keys to arrive together, so a [`docs::TempTreeSort`]
    /// on the grouping expression is inserted first when one is given.
    pub fn group_aggregate(
        self,
        group_by: Option<Expr>,
        builders: Vec<Box<dyn AggregatorBuilder>>,
    ) -> Self {
        self.group_aggregate_with(group_by, builders, SortConfig::default())
    }

    /// Same as [`Stream::group_aggregate`], with explicit sort settings
    pub fn group_aggregate_with(
        self,
        group_by: Option<Expr>,
        builders: Vec<Box<dyn AggregatorBuilder>>,
        sort_config: SortConfig,
    ) -> Self {
        let stream = match &group_by {
            Some(expr) => self.pipe(docs::TempTreeSort::with_config(expr.clone(), sort_config)),
            None => self,
        };
        stream.pipe(docs::GroupAggregate::new(group_by, builders))
    }

    /// Runs the pipeline, calling `f` for every row of the last stage.
    ///
    /// Returns `Ok` when the rows are exhausted or `f` asked to stop.
    pub fn iterate(
        &self,
        env: &Environment<'_>,
        mut f: impl FnMut(&Environment<'_>) -> StreamResult<Flow>,
    ) -> StreamResult<()> {
        match self.op.iterate(env, &mut f) {
            Ok(_) => Ok(()),
            Err(e) => {
                let message = e.to_string();
                Logger::error(
                    "STREAM_ERROR",
                    &[("code", e.code()), ("message", message.as_str())],
                );
                Err(e)
            }
        }
    }

    /// Runs the pipeline and collects the documents it produces
    pub fn collect_documents(&self, env: &Environment<'_>) -> StreamResult<Vec<Document>> {
        let mut docs = Vec::new();
        self.iterate(env, |row| {
            if let Some(doc) = row.document() {
                docs.push(doc.clone());
            }
            Ok(Flow::Continue)
        })?;
        Ok(docs)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut stages: Vec<&dyn Operator> = Vec::new();
        let mut current: Option<&dyn Operator> = Some(self.op.as_ref());
        while let Some(op) = current {
            stages.push(op);
            current = op.prev();
        }

        for (i, op) in stages.iter().rev().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Stream({})", self)
    }
}

/// Iterates `prev` if present. A stage without upstream produces no rows.
pub(crate) fn iterate_prev(
    prev: &Option<Box<dyn Operator>>,
    env: &Environment<'_>,
    f: &mut Continuation<'_>,
) -> StreamResult<Flow> {
    match prev {
        Some(op) => op.iterate(env, f),
        None => Ok(Flow::Continue),
    }
}
