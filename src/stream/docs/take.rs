//! Stage that passes at most `n` rows, then stops upstream

use std::fmt;

use crate::environment::Environment;
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};

/// Forwards the first `n` rows, then stops the upstream
pub struct Take {
    n: u64,
    prev: Option<Box<dyn Operator>>,
}

impl Take {
    pub fn new(n: u64) -> Self {
        Self { n, prev: None }
    }
}

impl Operator for Take {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        if self.n == 0 {
            return Ok(Flow::Stop);
        }

        let mut taken = 0;
        iterate_prev(&self.prev, env, &mut |row| {
            taken += 1;
            match f(row)? {
                Flow::Continue if taken < self.n => Ok(Flow::Continue),
                _ => Ok(Flow::Stop),
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

impl fmt::Display for Take {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Take({})", self.n)
    }
}
