//! Document stages
//!
//! Row stages transform each row as it passes. Buffering stages
//! ([`TempTreeSort`], [`GroupAggregate`]) consume their whole upstream
//! before producing output.

mod emit;
mod filter;
mod group_aggregate;
mod project;
mod skip;
mod take;
mod temp_tree_sort;

pub use emit::Emit;
pub use filter::Filter;
pub use group_aggregate::GroupAggregate;
pub use project::{Project, ProjectedField};
pub use skip::Skip;
pub use take::Take;
pub use temp_tree_sort::TempTreeSort;
