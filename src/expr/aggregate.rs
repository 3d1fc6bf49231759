//! Aggregator framework
//!
//! An [`AggregatorBuilder`] is immutable and reused across groups. For each
//! group the grouped-aggregation stage asks every builder for a fresh
//! [`Aggregator`], feeds it the group's rows, then finalizes it exactly once.
//!
//! `finalize` consumes the aggregator, so an aggregator cannot be fed or
//! finalized again afterwards.

use std::fmt;

use crate::environment::Environment;
use crate::types::Value;

use super::errors::ExprResult;

/// Stateless factory of per-group aggregators.
///
/// `Display` renders the builder in plan output and must match
/// [`AggregatorBuilder::label`].
pub trait AggregatorBuilder: fmt::Display + fmt::Debug {
    /// Output field name of the aggregate, e.g. `COUNT(a)`
    fn label(&self) -> String {
        self.to_string()
    }

    /// Creates a fresh aggregator with empty state
    fn aggregator(&self) -> Box<dyn Aggregator>;
}

/// Stateful accumulator owned by a single group
pub trait Aggregator {
    /// Updates the state from the row in `env`
    fn feed(&mut self, env: &Environment<'_>) -> ExprResult<()>;

    /// Produces the group's value.
    ///
    /// Every aggregator defines a result for a group that was never fed.
    fn finalize(self: Box<Self>, env: &Environment<'_>) -> ExprResult<Value>;
}
