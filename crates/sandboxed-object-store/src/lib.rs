//! # Sandboxed Object Store
//!
//! A small key/value object store backed by the local filesystem. Every object
//! lives under a single base directory and carries a string metadata map that is
//! persisted next to it as a JSON sidecar.
//!
//! Keys are slash separated relative paths (for example `1/0xabc.../image`).
//! Keys are validated before they touch the filesystem: empty keys, NUL bytes,
//! absolute paths and anything that resolves outside the base directory are
//! rejected.
//!
//! ## Basic Usage
//!
//! ```rust
//! use sandboxed_object_store::{ObjectMetadata, SandboxedStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = SandboxedStore::builder()
//!     .base_directory("/var/lib/myapp/objects")
//!     .build()
//!     .await?;
//!
//! let mut metadata = ObjectMetadata::new();
//! metadata.insert("provider".to_string(), "local".to_string());
//! store.put("1/0xabc/image", b"bytes", &metadata).await?;
//!
//! if let Some(object) = store.get("1/0xabc/image").await? {
//!     assert_eq!(object.metadata.get("provider").map(String::as_str), Some("local"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod security;
pub mod store;

pub use error::{Result, SandboxedStoreError};
pub use store::{
    METADATA_SUFFIX, ObjectMetadata, SandboxedStore, SandboxedStoreBuilder, StoredObject,
};
