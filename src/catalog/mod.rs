//! Table catalog
//!
//! Read-only registry of the tables visible to a query. Table scans check
//! the catalog before asking the transaction for documents.

use std::collections::BTreeMap;

/// Metadata of one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    name: String,
}

impl TableInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Registry of tables, keyed by name
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: BTreeMap<String, TableInfo>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table, replacing any table with the same name
    pub fn add_table(&mut self, info: TableInfo) {
        self.tables.insert(info.name.clone(), info);
    }

    pub fn table(&self, name: &str) -> Option<&TableInfo> {
        self.tables.get(name)
    }

    /// Table names in lexicographic order
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}
