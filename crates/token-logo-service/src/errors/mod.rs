//! Centralized error handling for the token logo service
//!
//! # Error Categories
//!
//! - **Validation Errors**: malformed chain ids or addresses at the HTTP boundary
//! - **Provider Errors**: upstream image sources (network, status, parsing, RPC)
//! - **Storage Errors**: object store reads and writes
//! - **External Service Errors**: the token registry and other collaborators
//!
//! Provider errors never leave the provider chain; they are logged and treated
//! as "no image". Storage errors are recorded per token during a sync. Only
//! errors that escape the sync pipeline itself end up on a `Failed` status.
//!
//! # Usage
//!
//! ```rust
//! use token_logo_service::errors::{AppError, AppResult};
//!
//! fn parse_chain(raw: &str) -> AppResult<u64> {
//!     raw.parse().map_err(|_| AppError::validation(format!("invalid chain id: {raw}")))
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for provider Results
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Convenience type alias for storage Results
pub type StorageResult<T> = Result<T, StorageError>;
