//! Stage that keeps rows whose predicate is truthy

use std::fmt;

use crate::environment::Environment;
use crate::expr::Expr;
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};

/// Keeps the rows for which the expression is truthy
pub struct Filter {
    expr: Expr,
    prev: Option<Box<dyn Operator>>,
}

impl Filter {
    pub fn new(expr: Expr) -> Self {
        Self { expr, prev: None }
    }
}

impl Operator for Filter {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        iterate_prev(&self.prev, env, &mut |row| {
            if self.expr.eval(row)?.is_truthy() {
                f(row)
            } else {
                Ok(Flow::Continue)
            }
        })
    }

    fn set_prev(&mut self, prev: Box<dyn Operator>) {
        self.prev = Some(prev);
    }

    fn prev(&self) -> Option<&dyn Operator> {
        self.prev.as_deref()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Filter({})", self.expr)
    }
}
