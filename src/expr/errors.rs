//! Expression evaluation errors

use thiserror::Error;

use crate::types::ValueType;

/// Result type for expression evaluation
pub type ExprResult<T> = Result<T, ExprError>;

/// Errors raised while evaluating an expression against a row
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("unknown parameter: {0}")]
    UnknownParam(String),

    #[error("no document in the current environment")]
    NoDocument,

    #[error("type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: ValueType,
        right: ValueType,
    },

    #[error("invalid path: '{0}'")]
    InvalidPath(String),
}

impl ExprError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ExprError::UnknownParam(_) => "DOCSTREAM_UNKNOWN_PARAM",
            ExprError::NoDocument => "DOCSTREAM_NO_DOCUMENT",
            ExprError::TypeMismatch { .. } => "DOCSTREAM_TYPE_MISMATCH",
            ExprError::InvalidPath(_) => "DOCSTREAM_INVALID_PATH",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mismatch_display() {
        let err = ExprError::TypeMismatch {
            op: "+",
            left: ValueType::Text,
            right: ValueType::Integer,
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot apply '+' to text and integer"
        );
        assert_eq!(err.code(), "DOCSTREAM_TYPE_MISMATCH");
    }
}
