//! In-memory source

use std::fmt;

use crate::environment::Environment;
use crate::stream::{Continuation, Flow, Operator, StreamResult};
use crate::types::Document;

/// Emits a fixed list of documents, in order
#[derive(Debug, Clone, Default)]
pub struct Emit {
    docs: Vec<Document>,
}

impl Emit {
    pub fn new(docs: Vec<Document>) -> Self {
        Self { docs }
    }
}

impl Operator for Emit {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        for doc in &self.docs {
            let mut row = env.child();
            row.set_document(doc);
            if f(&row)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }

    fn set_prev(&mut self, _prev: Box<dyn Operator>) {}

    fn prev(&self) -> Option<&dyn Operator> {
        None
    }
}

impl fmt::Display for Emit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Emit(")?;
        for (i, doc) in self.docs.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", doc)?;
        }
        write!(f, ")")
    }
}
