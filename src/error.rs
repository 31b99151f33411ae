//! Error types for Construct

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Construct operations
pub type Result<T> = std::result::Result<T, ConstructError>;

/// Main error type for Construct
#[derive(Error, Debug)]
pub enum ConstructError {
    /// Source loading and validation errors
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Command evaluation errors
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while locating, reading or validating a source file
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to find source file (searched: {0})")]
    NotFound(String),

    #[error("Failed to read '{path}': {error}")]
    Unreadable { path: PathBuf, error: String },

    #[error("Command '{0}' is defined more than once")]
    DuplicateCommand(String),

    #[error("Only one default command is allowed, found '{0}' and '{1}'")]
    MultipleDefaults(String, String),
}

/// Command evaluation errors
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("cannot find command with name {0}")]
    CommandNotFound(String),

    #[error("cannot find prerequisite '{prerequisite}' of command '{command}'")]
    PrerequisiteNotFound {
        command: String,
        prerequisite: String,
    },

    #[error("{0} is not optional")]
    MissingArgument(String),

    #[error("'{line}' could not be started: {error}")]
    Spawn { line: String, error: String },

    #[error("'{line}' failed with {status}")]
    ProcessFailed { line: String, status: String },

    #[error("'{0}' produced output that was not valid UTF-8")]
    InvalidUtf8(String),

    #[error("failed to start worker threads: {0}")]
    WorkerPool(String),
}

impl ExecutionError {
    /// Whether this error aborts the evaluation that raised it.
    ///
    /// Process errors are captured as text in place of the line's output,
    /// every other error bubbles up to the scheduler.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            ExecutionError::Spawn { .. }
                | ExecutionError::ProcessFailed { .. }
                | ExecutionError::InvalidUtf8(_)
        )
    }
}

/// Variable resolution errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScopeError {
    #[error("cannot find variable with name {0}")]
    VariableNotFound(String),
}

/// External task store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No task store is configured")]
    Unavailable,

    #[error("Failed to read task store '{path}': {error}")]
    Read { path: PathBuf, error: String },

    #[error("Malformed task store '{path}': {error}")]
    Malformed { path: PathBuf, error: String },

    #[error("{0} command not found in store")]
    Missing(String),
}

/// Specialized result type for load operations
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Specialized result type for execution operations
pub type ExecutionResult<T> = std::result::Result<T, ExecutionError>;

/// Specialized result type for scope resolution
pub type ScopeResult<T> = std::result::Result<T, ScopeError>;

/// Specialized result type for store lookups
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_errors_are_not_fatal() {
        let err = ExecutionError::ProcessFailed {
            line: "false".to_string(),
            status: "exit status: 1".to_string(),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "'false' failed with exit status: 1");
    }

    #[test]
    fn test_argument_error_is_fatal() {
        let err = ExecutionError::MissingArgument("build:target".to_string());
        assert!(err.is_fatal());
        assert_eq!(err.to_string(), "build:target is not optional");
    }
}
