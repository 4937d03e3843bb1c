//! Error types for the sandboxed object store.

use std::path::PathBuf;

/// Result type for sandboxed store operations.
pub type Result<T> = std::result::Result<T, SandboxedStoreError>;

/// Errors that can occur during sandboxed store operations.
#[derive(Debug, thiserror::Error)]
pub enum SandboxedStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key validation failed - potential security issue
    #[error("Invalid object key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// Resolved path escapes the sandbox or cannot be resolved
    #[error("Path validation failed: {path:?} - {reason}")]
    PathValidation { path: PathBuf, reason: String },

    /// Metadata sidecar could not be encoded or decoded
    #[error("Metadata error for {key}: {source}")]
    Metadata {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to create directory: {path:?} - {source}")]
    DirectoryCreation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Permission denied: {operation} on {path:?}")]
    Permission { operation: String, path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}
