//! Error type definitions for the token logo service

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// External service errors
    #[error("External service error: {service} - {message}")]
    ExternalService { service: String, message: String },

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Image provider errors
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors raised by individual image providers
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("{provider} returned HTTP {status}")]
    Status { provider: String, status: u16 },

    /// Upstream body did not have the expected shape
    #[error("Failed to parse {provider} response: {message}")]
    Parse { provider: String, message: String },

    /// JSON-RPC call failed or returned unusable data
    #[error("RPC call failed on chain {chain_id}: {message}")]
    Rpc { chain_id: u64, message: String },

    /// Local filesystem access failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Object storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying object store failure
    #[error("Object store error: {0}")]
    Store(#[from] sandboxed_object_store::SandboxedStoreError),

    /// Stored metadata is missing a field or holds an unexpected value
    #[error("Invalid metadata for {key}: {message}")]
    InvalidMetadata { key: String, message: String },

    /// Write was refused by the backing store
    #[error("Write rejected for {key}: {message}")]
    WriteRejected { key: String, message: String },
}

/// Convenience methods for creating common error types
impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an external service error
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl ProviderError {
    pub fn status<P: Into<String>>(provider: P, status: reqwest::StatusCode) -> Self {
        Self::Status {
            provider: provider.into(),
            status: status.as_u16(),
        }
    }

    pub fn parse<P: Into<String>, M: Into<String>>(provider: P, message: M) -> Self {
        Self::Parse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn rpc<M: Into<String>>(chain_id: u64, message: M) -> Self {
        Self::Rpc {
            chain_id,
            message: message.into(),
        }
    }
}

impl StorageError {
    pub fn invalid_metadata<K: Into<String>, M: Into<String>>(key: K, message: M) -> Self {
        Self::InvalidMetadata {
            key: key.into(),
            message: message.into(),
        }
    }
}
