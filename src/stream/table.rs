//! Table scan source

use std::fmt;

use crate::environment::Environment;
use crate::types::write_quoted;

use super::{Continuation, Flow, Operator, StreamError, StreamResult};

/// Emits every document of a table, in storage order, read through the
/// transaction of the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScan {
    table: String,
}

impl TableScan {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }
}

impl Operator for TableScan {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        let tx = env.transaction().ok_or(StreamError::NoTransaction)?;

        if let Some(catalog) = env.catalog() {
            if catalog.table(&self.table).is_none() {
                return Err(StreamError::TableNotFound(self.table.clone()));
            }
        }

        tx.scan(&self.table, &mut |doc| {
            let mut row = env.child();
            row.set_document(doc);
            f(&row)
        })
    }

    fn set_prev(&mut self, _prev: Box<dyn Operator>) {}

    fn prev(&self) -> Option<&dyn Operator> {
        None
    }
}

impl fmt::Display for TableScan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TableScan(")?;
        write_quoted(f, &self.table)?;
        write!(f, ")")
    }
}
