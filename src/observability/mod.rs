//! Observability
//!
//! Structured, synchronous JSON-lines logging. Logging never affects
//! execution: write failures are ignored.
//!
//! ```ignore
//! use docstream::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! Logger::info("SORT_SPILL", &[("run", "0"), ("records", "512")]);
//! ```
//!
//! # Events
//!
//! | Event          | Severity | Fields                    |
//! |----------------|----------|---------------------------|
//! | `SORT_SPILL`   | INFO     | `run`, `records`, `bytes` |
//! | `SORT_COMPACT` | INFO     | `runs`, `entries`         |
//! | `GROUP_FLUSH`  | TRACE    | `fields`                  |
//! | `STREAM_ERROR` | ERROR    | `code`, `message`         |

mod logger;

pub use logger::{Logger, Severity};
