//! docstream - streaming query execution over documents
//!
//! A pipeline of push-based stages over an execution environment:
//!
//! ```text
//! TableScan("t") | TempTreeSort(a % 2) | GroupAggregate(a % 2, COUNT(*))
//! ```
//!
//! - `types`: values, documents and their binary encoding
//! - `environment`: per-row scopes with parameters and engine handles
//! - `expr`: expressions and the aggregator framework
//! - `stream`: operators, external sort and grouped aggregation
//! - `storage`, `catalog`: read-only collaborators of the source stage

pub mod catalog;
pub mod cli;
pub mod config;
pub mod environment;
pub mod expr;
pub mod observability;
pub mod storage;
pub mod stream;
pub mod types;
