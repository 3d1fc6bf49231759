//! CLI-specific error types
//!
//! Every CLI error ends the process with a non-zero status.

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::expr::ExprError;
use crate::stream::StreamError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (input file, stdin/stdout)
    IoError,
    /// Malformed input document
    InvalidInput,
    /// Malformed command-line argument
    InvalidArgument,
    /// Pipeline execution failed
    ExecutionFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "DOCSTREAM_CLI_CONFIG_ERROR",
            Self::IoError => "DOCSTREAM_CLI_IO_ERROR",
            Self::InvalidInput => "DOCSTREAM_CLI_INVALID_INPUT",
            Self::InvalidArgument => "DOCSTREAM_CLI_INVALID_ARGUMENT",
            Self::ExecutionFailed => "DOCSTREAM_CLI_EXECUTION_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn execution_failed(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ExecutionFailed, msg)
    }

    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<ExprError> for CliError {
    fn from(e: ExprError) -> Self {
        Self::invalid_argument(e.to_string())
    }
}

impl From<StreamError> for CliError {
    fn from(e: StreamError) -> Self {
        Self::execution_failed(format!("{} ({})", e, e.code()))
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_code() {
        let err = CliError::invalid_argument("bad --agg");
        assert_eq!(err.to_string(), "DOCSTREAM_CLI_INVALID_ARGUMENT: bad --agg");
        assert_eq!(err.message(), "bad --agg");
    }

    #[test]
    fn test_stream_error_conversion() {
        let err = CliError::from(StreamError::TableNotFound("input".into()));
        assert_eq!(err.code(), &CliErrorCode::ExecutionFailed);
        assert!(err.message().contains("DOCSTREAM_TABLE_NOT_FOUND"));
    }
}
