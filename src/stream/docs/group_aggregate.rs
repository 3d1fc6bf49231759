//! Grouped aggregation stage
//!
//! Consumes rows already ordered by the grouping expression and emits one
//! document per run of rows with equal keys:
//!
//! ```text
//! Idle ──first row──► InGroup ──key changes──► flush, InGroup
//!   │                    │
//!   └──end of input──────┴──► Done (flush pending group)
//! ```
//!
//! Without a grouping expression the whole input is one group, and an empty
//! input still produces a single document of zero-input results.
//!
//! Output documents hold the key under the expression's text (when grouping)
//! followed by one field per aggregator, in declaration order. Names are
//! expected to be distinct: a repeated name keeps its first position and the
//! last value written to it.

use std::fmt;
use std::mem;

use crate::environment::Environment;
use crate::expr::{Aggregator, AggregatorBuilder, Expr};
use crate::observability::{Logger, Severity};
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};
use crate::types::{Document, Value};

enum GroupState {
    Idle,
    InGroup {
        key: Value,
        aggregators: Vec<Box<dyn Aggregator>>,
    },
}

/// Aggregates contiguous groups of rows
pub struct GroupAggregate {
    group_by: Option<Expr>,
    builders: Vec<Box<dyn AggregatorBuilder>>,
    prev: Option<Box<dyn Operator>>,
}

impl GroupAggregate {
    pub fn new(group_by: Option<Expr>, builders: Vec<Box<dyn AggregatorBuilder>>) -> Self {
        Self {
            group_by,
            builders,
            prev: None,
        }
    }

    fn fresh_aggregators(&self) -> Vec<Box<dyn Aggregator>> {
        self.builders.iter().map(|b| b.aggregator()).collect()
    }

    fn flush(
        &self,
        env: &Environment<'_>,
        key: Value,
        aggregators: Vec<Box<dyn Aggregator>>,
        f: &mut Continuation<'_>,
    ) -> StreamResult<Flow> {
        let mut doc = Document::with_capacity(self.builders.len() + 1);
        if let Some(expr) = &self.group_by {
            doc.add(expr.to_string(), key);
        }
        for (builder, aggregator) in self.builders.iter().zip(aggregators) {
            doc.add(builder.label(), aggregator.finalize(env)?);
        }

        if Logger::enabled(Severity::Trace) {
            let fields = doc.len().to_string();
            Logger::trace("GROUP_FLUSH", &[("fields", fields.as_str())]);
        }

        let mut row = env.child();
        row.set_document(&doc);
        f(&row)
    }
}

impl Operator for GroupAggregate {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        let mut state = GroupState::Idle;
        let mut stopped = false;

        iterate_prev(&self.prev, env, &mut |row| {
            let key = match &self.group_by {
                Some(expr) => expr.eval(row)?,
                None => Value::Null,
            };

            if let GroupState::InGroup {
                key: current,
                aggregators,
            } = &mut state
            {
                if *current == key {
                    for aggregator in aggregators.iter_mut() {
                        aggregator.feed(row)?;
                    }
                    return Ok(Flow::Continue);
                }
            }

            if let GroupState::InGroup {
                key: current,
                aggregators,
            } = mem::replace(&mut state, GroupState::Idle)
            {
                if self.flush(env, current, aggregators, f)? == Flow::Stop {
                    stopped = true;
                    return Ok(Flow::Stop);
                }
            }

            let mut aggregators = self.fresh_aggregators();
            for aggregator in aggregators.iter_mut() {
                aggregator.feed(row)?;
            }
            state = GroupState::InGroup { key, aggregators };
            Ok(Flow::Continue)
        })?;

        if stopped {
            return Ok(Flow::Stop);
        }

        // Upstream is exhausted, or ended early on its own: flush what is pending
        match state {
            GroupState::InGroup { key, aggregators } => self.flush(env, key, aggregators, f),
            GroupState::Idle if self.group_by.is_none() => {
                self.flush(env, Value::Null, self.fresh_aggregators(), f)
            }
            GroupState::Idle => Ok(Flow::Continue),
        }
    }

    fn set_prev(&mut self, prev: Box<dyn Operator>) {
        self.prev = Some(prev);
    }

    fn prev(&self) -> Option<&dyn Operator> {
        self.prev.as_deref()
    }
}

impl fmt::Display for GroupAggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GroupAggregate(")?;
        match &self.group_by {
            Some(expr) => write!(f, "{}", expr)?,
            None => write!(f, "{}", Value::Null)?,
        }
        for builder in &self.builders {
            write!(f, ", {}", builder)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::functions::{Avg, Count};
    use crate::expr::ExprResult;
    use crate::stream::docs::{Emit, Take, TempTreeSort};
    use crate::stream::Stream;

    /// Counts the rows it is fed, under a fixed label
    #[derive(Debug)]
    struct Fake(&'static str);

    impl fmt::Display for Fake {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl AggregatorBuilder for Fake {
        fn aggregator(&self) -> Box<dyn Aggregator> {
            Box::new(FakeAggregator(0))
        }
    }

    struct FakeAggregator(i64);

    impl Aggregator for FakeAggregator {
        fn feed(&mut self, _env: &Environment<'_>) -> ExprResult<()> {
            self.0 += 1;
            Ok(())
        }

        fn finalize(self: Box<Self>, _env: &Environment<'_>) -> ExprResult<Value> {
            Ok(Value::Integer(self.0))
        }
    }

    fn fakes(names: &[&'static str]) -> Vec<Box<dyn AggregatorBuilder>> {
        names
            .iter()
            .map(|n| Box::new(Fake(*n)) as Box<dyn AggregatorBuilder>)
            .collect()
    }

    fn seq(n: i64) -> Vec<Document> {
        (0..n).map(|i| Document::new().with_field("a", i)).collect()
    }

    fn run(
        input: Vec<Document>,
        group_by: Option<Expr>,
        builders: Vec<Box<dyn AggregatorBuilder>>,
    ) -> Vec<Document> {
        let mut stream = Stream::new(Emit::new(input));
        if let Some(expr) = &group_by {
            stream = stream.pipe(TempTreeSort::new(expr.clone()));
        }
        stream
            .pipe(GroupAggregate::new(group_by, builders))
            .collect_documents(&Environment::new())
            .unwrap()
    }

    fn a_mod_2() -> Expr {
        Expr::field("a").modulo(2)
    }

    #[test]
    fn test_fake_count() {
        let out = run(
            vec![Document::new().with_field("a", 10)],
            None,
            fakes(&["agg"]),
        );
        assert_eq!(out, vec![Document::new().with_field("agg", 1)]);
    }

    #[test]
    fn test_count_wildcard() {
        let out = run(
            vec![Document::new().with_field("a", 10)],
            None,
            vec![Box::new(Count::wildcard())],
        );
        assert_eq!(out, vec![Document::new().with_field("COUNT(*)", 1)]);
    }

    #[test]
    fn test_count_group_by() {
        let out = run(
            seq(10),
            Some(a_mod_2()),
            vec![
                Box::new(Count::of(Expr::field("a"))),
                Box::new(Avg::of(Expr::field("a"))),
            ],
        );

        assert_eq!(
            out,
            vec![
                Document::new()
                    .with_field("a % 2", 0)
                    .with_field("COUNT(a)", 5)
                    .with_field("AVG(a)", 4.0),
                Document::new()
                    .with_field("a % 2", 1)
                    .with_field("COUNT(a)", 5)
                    .with_field("AVG(a)", 5.0),
            ]
        );
        assert_eq!(out[0].field_names(), vec!["a % 2", "COUNT(a)", "AVG(a)"]);
    }

    #[test]
    fn test_no_input_without_key() {
        let out = run(
            Vec::new(),
            None,
            vec![
                Box::new(Count::of(Expr::field("a"))),
                Box::new(Avg::of(Expr::field("a"))),
            ],
        );
        assert_eq!(
            out,
            vec![Document::new()
                .with_field("COUNT(a)", 0)
                .with_field("AVG(a)", 0.0)]
        );
    }

    #[test]
    fn test_no_input_with_key() {
        let out = run(Vec::new(), Some(a_mod_2()), fakes(&["agg"]));
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_aggregator() {
        let out = run(seq(4), Some(a_mod_2()), Vec::new());
        assert_eq!(
            out,
            vec![
                Document::new().with_field("a % 2", 0),
                Document::new().with_field("a % 2", 1),
            ]
        );
    }

    #[test]
    fn test_stop_after_first_group() {
        let stream = Stream::new(Emit::new(seq(10)))
            .pipe(TempTreeSort::new(a_mod_2()))
            .pipe(GroupAggregate::new(Some(a_mod_2()), fakes(&["agg"])))
            .pipe(Take::new(1));

        let out = stream.collect_documents(&Environment::new()).unwrap();
        assert_eq!(
            out,
            vec![Document::new().with_field("a % 2", 0).with_field("agg", 5)]
        );
    }

    #[test]
    fn test_upstream_take_still_flushes() {
        let stream = Stream::new(Emit::new(seq(10)))
            .pipe(Take::new(3))
            .pipe(GroupAggregate::new(None, fakes(&["agg"])));

        let out = stream.collect_documents(&Environment::new()).unwrap();
        assert_eq!(out, vec![Document::new().with_field("agg", 3)]);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            GroupAggregate::new(Some(a_mod_2()), fakes(&["a()", "b()"])).to_string(),
            "GroupAggregate(a % 2, a(), b())"
        );
        assert_eq!(
            GroupAggregate::new(None, fakes(&["a()", "b()"])).to_string(),
            "GroupAggregate(NULL, a(), b())"
        );
        assert_eq!(
            GroupAggregate::new(Some(a_mod_2()), Vec::new()).to_string(),
            "GroupAggregate(a % 2)"
        );
    }
}
