//! In-memory document tables

use std::collections::BTreeMap;

use crate::catalog::{Catalog, TableInfo};
use crate::stream::{Flow, StreamError, StreamResult};
use crate::types::Document;

use super::Transaction;

/// Tables of documents kept in memory, in insertion order
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty table. Creating an existing table is a no-op.
    pub fn create_table(&mut self, name: impl Into<String>) {
        self.tables.entry(name.into()).or_default();
    }

    /// Appends a document to an existing table
    pub fn insert(&mut self, table: &str, doc: Document) -> StreamResult<()> {
        match self.tables.get_mut(table) {
            Some(docs) => {
                docs.push(doc);
                Ok(())
            }
            None => Err(StreamError::TableNotFound(table.to_string())),
        }
    }

    /// Catalog describing the tables of this store
    pub fn catalog(&self) -> Catalog {
        let mut catalog = Catalog::new();
        for name in self.tables.keys() {
            catalog.add_table(TableInfo::new(name.clone()));
        }
        catalog
    }

    /// Opens a read-only transaction
    pub fn begin(&self) -> MemoryTransaction<'_> {
        MemoryTransaction { store: self }
    }
}

/// Read-only view over a [`MemoryStore`]
#[derive(Debug, Clone, Copy)]
pub struct MemoryTransaction<'a> {
    store: &'a MemoryStore,
}

impl Transaction for MemoryTransaction<'_> {
    fn scan(
        &self,
        table: &str,
        f: &mut dyn FnMut(&Document) -> StreamResult<Flow>,
    ) -> StreamResult<Flow> {
        let docs = self
            .store
            .tables
            .get(table)
            .ok_or_else(|| StreamError::TableNotFound(table.to_string()))?;

        for doc in docs {
            if f(doc)? == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
        Ok(Flow::Continue)
    }
}
