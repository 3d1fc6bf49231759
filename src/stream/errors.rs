//! Stream error types
//!
//! Error classes:
//! - evaluation errors from expressions and aggregators
//! - resource errors from the ephemeral sort store (spill I/O, corruption)
//! - environment errors (missing transaction, unknown table)
//!
//! A downstream stop request is not an error; it travels as
//! [`Flow::Stop`](super::Flow::Stop).

use std::io;

use thiserror::Error;

use crate::expr::ExprError;
use crate::types::DecodeError;

/// Result type for stream operations
pub type StreamResult<T> = Result<T, StreamError>;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("evaluation failed: {0}")]
    Eval(#[from] ExprError),

    #[error("table not found: {0}")]
    TableNotFound(String),

    #[error("no transaction in the current environment")]
    NoTransaction,

    #[error("spill failed: {message}")]
    Spill {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("spill run {run} corrupted at offset {offset}: {reason}")]
    SpillCorrupted {
        run: usize,
        offset: u64,
        reason: String,
    },
}

impl StreamError {
    pub(crate) fn spill(message: impl Into<String>, source: io::Error) -> Self {
        StreamError::Spill {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn corrupted(run: usize, offset: u64, reason: impl Into<String>) -> Self {
        StreamError::SpillCorrupted {
            run,
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(run: usize, offset: u64, err: DecodeError) -> Self {
        Self::corrupted(run, offset, err.to_string())
    }

    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            StreamError::Eval(e) => e.code(),
            StreamError::TableNotFound(_) => "DOCSTREAM_TABLE_NOT_FOUND",
            StreamError::NoTransaction => "DOCSTREAM_NO_TRANSACTION",
            StreamError::Spill { .. } => "DOCSTREAM_SPILL_FAILED",
            StreamError::SpillCorrupted { .. } => "DOCSTREAM_SPILL_CORRUPTED",
        }
    }

    /// Corrupted spill data means the temporary storage is not trustworthy
    pub fn is_fatal(&self) -> bool {
        matches!(self, StreamError::SpillCorrupted { .. })
    }
}
