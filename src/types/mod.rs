//! Value and document model
//!
//! A `Document` is one row flowing through the pipeline: an ordered list of
//! uniquely named fields, each holding a typed `Value`.
//!
//! # Ordering
//!
//! Values carry a single total order used for both sorting and grouping:
//!
//! ```text
//! NULL < BOOL < numbers (INTEGER, DOUBLE) < TEXT < BLOB < ARRAY < DOCUMENT
//! ```
//!
//! Integers and doubles share one numeric class and compare by value.

mod document;
pub mod encoding;
mod value;

pub use document::Document;
pub use encoding::DecodeError;
pub use value::{Value, ValueType};
pub(crate) use value::write_quoted;
