//! Storage contracts consumed by the query pipeline
//!
//! The storage engine itself lives outside the pipeline. Stages only see a
//! read-only [`Transaction`] handle through the execution environment and
//! iterate the documents of a table in insertion order.
//!
//! [`MemoryStore`] is an in-memory implementation used by the command-line
//! tool and by tests.

mod memory;

pub use memory::{MemoryStore, MemoryTransaction};

use crate::stream::{Flow, StreamResult};
use crate::types::Document;

/// Read-only transactional handle over stored tables.
pub trait Transaction {
    /// Calls `f` once per document of `table`, in insertion order.
    ///
    /// Stops as soon as `f` returns an error or [`Flow::Stop`] and returns
    /// that outcome unchanged.
    fn scan(
        &self,
        table: &str,
        f: &mut dyn FnMut(&Document) -> StreamResult<Flow>,
    ) -> StreamResult<Flow>;
}
