//! Stage that replaces each row with a document of selected fields

use std::fmt;

use crate::environment::Environment;
use crate::expr::Expr;
use crate::stream::{iterate_prev, Continuation, Flow, Operator, StreamResult};
use crate::types::Document;

/// One output field of a [`Project`]
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedField {
    pub expr: Expr,
    pub alias: Option<String>,
}

impl ProjectedField {
    pub fn new(expr: Expr) -> Self {
        Self { expr, alias: None }
    }

    pub fn aliased(expr: Expr, alias: impl Into<String>) -> Self {
        Self {
            expr,
            alias: Some(alias.into()),
        }
    }

    /// Output field name: the alias, or the expression text
    pub fn name(&self) -> String {
        match &self.alias {
            Some(alias) => alias.clone(),
            None => self.expr.to_string(),
        }
    }
}

impl fmt::Display for ProjectedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.alias {
            Some(alias) => write!(f, "{} AS {}", self.expr, alias),
            None => write!(f, "{}", self.expr),
        }
    }
}

/// Replaces each row by a document built from the projected fields
pub struct Project {
    fields: Vec<ProjectedField>,
    prev: Option<Box<dyn Operator>>,
}

impl Project {
    pub fn new(fields: Vec<ProjectedField>) -> Self {
        Self { fields, prev: None }
    }
}

impl Operator for Project {
    fn iterate(&self, env: &Environment<'_>, f: &mut Continuation<'_>) -> StreamResult<Flow> {
        iterate_prev(&self.prev, env, &mut |row| {
            let mut doc = Document::with_capacity(self.fields.len());
            for field in &self.fields {
                doc.add(field.name(), field.expr.eval(row)?);
            }

            let mut out = row.child();
            out.set_document(&doc);
            f(&out)
        })
    }

    fn set_prev(&mut self, prev: Box<dyn Operator>) {
        self.prev = Some(prev);
    }

    fn prev(&self) -> Option<&dyn Operator> {
        self.prev.as_deref()
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Project(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}
