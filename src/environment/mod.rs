//! Execution environment
//!
//! An [`Environment`] is the scope a stage evaluates expressions in. It
//! carries:
//!
//! - the current document (one row, or one group's output)
//! - query parameters and named variable bindings
//! - read-only handles to the active transaction and catalog
//! - an optional parent scope
//!
//! Stages never mutate the environment they receive. To expose a row to
//! their consumer they create a [`Environment::child`] scope on their own
//! stack frame, so each scope lives exactly as long as one row's (or one
//! group's) processing step. Lookups that miss in a scope fall back to its
//! parent.

use std::fmt;

use crate::catalog::Catalog;
use crate::storage::Transaction;
use crate::types::{Document, Value};

/// A query parameter, either positional (`?`) or named (`$name`)
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Option<String>,
    pub value: Value,
}

impl Param {
    pub fn positional(value: impl Into<Value>) -> Self {
        Self {
            name: None,
            value: value.into(),
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
        }
    }
}

/// Per-row execution scope
#[derive(Default)]
pub struct Environment<'a> {
    parent: Option<&'a Environment<'a>>,
    document: Option<&'a Document>,
    params: Vec<Param>,
    vars: Vec<(String, Value)>,
    transaction: Option<&'a dyn Transaction>,
    catalog: Option<&'a Catalog>,
}

impl<'a> Environment<'a> {
    /// Creates an empty root environment
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction(mut self, tx: &'a dyn Transaction) -> Self {
        self.transaction = Some(tx);
        self
    }

    pub fn with_catalog(mut self, catalog: &'a Catalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_document(mut self, doc: &'a Document) -> Self {
        self.document = Some(doc);
        self
    }

    /// Creates a nested scope whose lookups fall back to `self`
    pub fn child(&'a self) -> Environment<'a> {
        Environment {
            parent: Some(self),
            ..Environment::default()
        }
    }

    /// Sets the current document of this scope
    pub fn set_document(&mut self, doc: &'a Document) {
        self.document = Some(doc);
    }

    /// Binds a variable in this scope, shadowing bindings of outer scopes
    pub fn set_var(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.vars.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Current document of the nearest scope that has one
    pub fn document(&self) -> Option<&'a Document> {
        match self.document {
            Some(doc) => Some(doc),
            None => self.parent.and_then(|p| p.document()),
        }
    }

    /// Looks up a variable binding, innermost scope first
    pub fn var(&self, name: &str) -> Option<&Value> {
        self.vars
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .or_else(|| self.parent.and_then(|p| p.var(name)))
    }

    /// Positional parameter, 1-based
    pub fn param_by_index(&self, index: usize) -> Option<&Value> {
        if self.params.is_empty() {
            return self.parent.and_then(|p| p.param_by_index(index));
        }
        index
            .checked_sub(1)
            .and_then(|i| self.params.get(i))
            .map(|p| &p.value)
    }

    pub fn param_by_name(&self, name: &str) -> Option<&Value> {
        if self.params.is_empty() {
            return self.parent.and_then(|p| p.param_by_name(name));
        }
        self.params
            .iter()
            .find(|p| p.name.as_deref() == Some(name))
            .map(|p| &p.value)
    }

    pub fn transaction(&self) -> Option<&'a dyn Transaction> {
        match self.transaction {
            Some(tx) => Some(tx),
            None => self.parent.and_then(|p| p.transaction()),
        }
    }

    pub fn catalog(&self) -> Option<&'a Catalog> {
        match self.catalog {
            Some(catalog) => Some(catalog),
            None => self.parent.and_then(|p| p.catalog()),
        }
    }
}

impl fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("document", &self.document)
            .field("params", &self.params)
            .field("vars", &self.vars)
            .field("has_transaction", &self.transaction.is_some())
            .field("has_catalog", &self.catalog.is_some())
            .field("parent", &self.parent)
            .finish()
    }
}
