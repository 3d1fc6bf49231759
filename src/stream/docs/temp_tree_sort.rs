//! External sort stage
//!
//! Drives the upstream to completion, storing every row in a [`TempTree`]
//! keyed by the sort expression, then replays the rows in
//! `(key, arrival)` order. Equal keys keep their arrival order.
//!
//! The tree is owned by a single `iterate` call and dropped on every exit
//! path, which deletes any spilled runs.

use std::fmt;

use crate::environment::Environment;
use crate::expr::{Expr, ExprError};
use crate::stream::temp_tree::{SortConfig, TempTree};
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};

/// Sorts rows by an expression, spilling to disk past the memory budget
pub struct TempTreeSort {
    expr: Expr,
    config: SortConfig,
    prev: Option<Box<dyn Operator>>,
}

impl TempTreeSort {
    pub fn new(expr: Expr) -> Self {
        Self::with_config(expr, SortConfig::default())
    }

    pub fn with_config(expr: Expr, config: SortConfig) -> Self {
        Self {
            expr,
            config,
            prev: None,
        }
    }
}

impl Operator for TempTreeSort {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        let mut tree = TempTree::new(&self.config);

        // Any upstream stop, including one from a Take, marks the end of input
        iterate_prev(&self.prev, env, &mut |row| {
            let key = self.expr.eval(row)?;
            let doc = row.document().ok_or(ExprError::NoDocument)?;
            tree.insert(key, doc)?;
            Ok(Flow::Continue)
        })?;

        tree.drain(|doc| {
            let mut row = env.child();
            row.set_document(&doc);
            f(&row)
        })
    }

    fn set_prev(&mut self, prev: Box<dyn Operator>) {
        self.prev = Some(prev);
    }

    fn prev(&self) -> Option<&dyn Operator> {
        self.prev.as_deref()
    }
}

impl fmt::Display for TempTreeSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TempTreeSort({})", self.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::docs::{Emit, Take};
    use crate::stream::{Stream, StreamError};
    use crate::types::{Document, Value};
    use tempfile::TempDir;

    fn docs(values: &[i64]) -> Vec<Document> {
        values
            .iter()
            .enumerate()
            .map(|(i, a)| Document::new().with_field("a", *a).with_field("i", i as i64))
            .collect()
    }

    fn column(docs: &[Document], name: &str) -> Vec<i64> {
        docs.iter()
            .filter_map(|d| d.get(name).and_then(Value::as_i64))
            .collect()
    }

    #[test]
    fn test_sorts_stably() {
        let stream = Stream::new(Emit::new(docs(&[5, 2, 8, 2, 5])))
            .pipe(TempTreeSort::new(Expr::field("a")));

        let out = stream.collect_documents(&Environment::new()).unwrap();
        assert_eq!(column(&out, "a"), vec![2, 2, 5, 5, 8]);
        assert_eq!(column(&out, "i"), vec![1, 3, 0, 4, 2]);
    }

    #[test]
    fn test_sorts_by_expression() {
        let stream = Stream::new(Emit::new(docs(&[0, 1, 2, 3, 4])))
            .pipe(TempTreeSort::new(Expr::field("a").modulo(2)));

        let out = stream.collect_documents(&Environment::new()).unwrap();
        assert_eq!(column(&out, "a"), vec![0, 2, 4, 1, 3]);
    }

    #[test]
    fn test_spills_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let config = SortConfig::default()
            .with_memory_budget(64)
            .with_spill_dir(dir.path());
        let values: Vec<i64> = (0..100).map(|i| (i * 7) % 13).collect();
        let stream = Stream::new(Emit::new(docs(&values)))
            .pipe(TempTreeSort::with_config(Expr::field("a"), config));

        let mut files_during = 0;
        let mut out = Vec::new();
        stream
            .iterate(&Environment::new(), |row| {
                if out.is_empty() {
                    files_during = std::fs::read_dir(dir.path()).unwrap().count();
                }
                out.push(row.document().unwrap().clone());
                Ok(Flow::Continue)
            })
            .unwrap();

        let mut expected = values.clone();
        expected.sort();
        assert_eq!(column(&out, "a"), expected);
        assert!(files_during > 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_downstream_stop_cleans_up() {
        let dir = TempDir::new().unwrap();
        let config = SortConfig::default()
            .with_memory_budget(1)
            .with_spill_dir(dir.path());
        let stream = Stream::new(Emit::new(docs(&[3, 1, 2])))
            .pipe(TempTreeSort::with_config(Expr::field("a"), config))
            .pipe(Take::new(1));

        let out = stream.collect_documents(&Environment::new()).unwrap();
        assert_eq!(column(&out, "a"), vec![1]);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_key_error_aborts_and_cleans_up() {
        let dir = TempDir::new().unwrap();
        let config = SortConfig::default()
            .with_memory_budget(1)
            .with_spill_dir(dir.path());
        let mut input = docs(&[1, 2]);
        input.push(Document::new().with_field("a", "x"));
        let stream = Stream::new(Emit::new(input))
            .pipe(TempTreeSort::with_config(Expr::field("a").add(1), config));

        let mut seen = 0;
        let err = stream
            .iterate(&Environment::new(), |_| {
                seen += 1;
                Ok(Flow::Continue)
            })
            .unwrap_err();

        assert!(matches!(err, StreamError::Eval(ExprError::TypeMismatch { .. })));
        assert_eq!(seen, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            TempTreeSort::new(Expr::field("a").modulo(2)).to_string(),
            "TempTreeSort(a % 2)"
        );
    }
}
