//! Execution configuration
//!
//! Loaded from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "sort_memory_budget_bytes": 8388608,
//!   "spill_dir": "/var/tmp/docstream",
//!   "log_level": "INFO"
//! }
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::stream::temp_tree::DEFAULT_SORT_MEMORY_BUDGET;
use crate::stream::SortConfig;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "DOCSTREAM_CONFIG_READ",
            ConfigError::Parse(_) => "DOCSTREAM_CONFIG_PARSE",
            ConfigError::Invalid(_) => "DOCSTREAM_CONFIG_INVALID",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionConfig {
    /// In-memory sort buffer size before spilling (default 8 MiB)
    #[serde(default = "default_sort_memory_budget")]
    pub sort_memory_budget_bytes: usize,

    /// Directory for sort spill files (default: system temp dir)
    #[serde(default)]
    pub spill_dir: Option<PathBuf>,

    /// Minimum log severity (default "INFO")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_sort_memory_budget() -> usize {
    DEFAULT_SORT_MEMORY_BUDGET
}

fn default_log_level() -> String {
    Severity::Info.as_str().to_string()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            sort_memory_budget_bytes: default_sort_memory_budget(),
            spill_dir: None,
            log_level: default_log_level(),
        }
    }
}

impl ExecutionConfig {
    /// Reads and validates a configuration file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: ExecutionConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.sort_memory_budget_bytes == 0 {
            return Err(ConfigError::Invalid(
                "sort_memory_budget_bytes must be > 0".into(),
            ));
        }

        if let Some(dir) = &self.spill_dir {
            if !dir.is_dir() {
                return Err(ConfigError::Invalid(format!(
                    "spill_dir '{}' is not a directory",
                    dir.display()
                )));
            }
        }

        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "log_level '{}' must be one of TRACE, INFO, WARN, ERROR, FATAL",
                self.log_level
            ))
        })
    }

    /// Settings of the sort stage
    pub fn sort_config(&self) -> SortConfig {
        SortConfig {
            memory_budget_bytes: self.sort_memory_budget_bytes,
            spill_dir: self.spill_dir.clone(),
        }
    }
}
