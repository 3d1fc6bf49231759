//! Stage that drops the first `n` rows

use std::fmt;

use crate::environment::Environment;
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};

/// Drops the first `n` rows
pub struct Skip {
    n: u64,
    prev: Option<Box<dyn Operator>>,
}

impl Skip {
    pub fn new(n: u64) -> Self {
        Self { n, prev: None }
    }
}

impl Operator for Skip {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        let mut skipped = 0;
        iterate_prev(&self.prev, env, &mut |row| {
            if skipped < self.n {
                skipped += 1;
                return Ok(Flow::Continue);
            }
            f(row)
        })
    }

    fn set_prev(&mut self, prev: Box<dyn Operator>) {
        self.prev = Some(prev);
    }

    fn prev(&self) -> Option<&dyn Operator> {
        self.prev.as_deref()
    }
}

impl fmt::Display for Skip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skip({})", self.n)
    }
}
