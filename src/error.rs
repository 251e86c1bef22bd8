//! Error types for Verdict
//!
//! Uses `thiserror` for library errors; the binary wraps these in `anyhow`.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Verdict operations
pub type VerdictResult<T> = Result<T, VerdictError>;

/// Main error type for Verdict operations
#[derive(Error, Debug)]
pub enum VerdictError {
    /// Command rejected by the security policy
    #[error("command blocked: {reason}")]
    CommandBlocked { reason: String },

    /// Empty or whitespace-only test command
    #[error("empty test command")]
    EmptyCommand,

    /// Working directory does not exist
    #[error("working directory not found: {}", path.display())]
    WorkingDirNotFound { path: PathBuf },

    /// Test execution exceeded its deadline
    #[error("test execution timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Invalid configuration file
    #[error("invalid config in {}: {message}", file.display())]
    InvalidConfig { file: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
