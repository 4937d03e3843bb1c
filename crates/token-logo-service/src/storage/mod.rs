//! Storage gateway for synced images.
//!
//! One object per `(chainId, lowercased address)` under the key
//! `{chainId}/{address}/image`. The extension is not part of the key; it is
//! carried in the object metadata together with the provider, download date
//! and original location.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tracing::warn;

use crate::errors::StorageResult;
use crate::models::{ImageExtension, Token, normalize_address};

pub mod file_store;

pub use file_store::FileImageStore;

/// Concurrent existence checks issued by the default `bulk_exists`.
const BULK_EXISTS_CONCURRENCY: usize = 32;

pub fn object_key(chain_id: u64, address: &str) -> String {
    format!("{}/{}/image", chain_id, normalize_address(address))
}

/// Metadata persisted with every stored image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub extension: ImageExtension,
    pub provider: String,
    pub download_date: DateTime<Utc>,
    /// Remote URL or local path the bytes came from
    pub original_url: Option<String>,
}

impl ImageMetadata {
    pub fn new(
        extension: ImageExtension,
        provider: impl Into<String>,
        original_url: Option<String>,
    ) -> Self {
        Self {
            extension,
            provider: provider.into(),
            download_date: Utc::now(),
            original_url,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub bytes: Bytes,
    pub metadata: ImageMetadata,
}

impl StoredImage {
    pub fn content_type(&self) -> &'static str {
        self.metadata.extension.content_type()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExistenceCheck {
    pub token: Token,
    pub exists: bool,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn exists(&self, chain_id: u64, address: &str) -> StorageResult<bool>;

    async fn get(&self, chain_id: u64, address: &str) -> StorageResult<Option<StoredImage>>;

    /// Writes or replaces the image for a token.
    async fn put(
        &self,
        chain_id: u64,
        address: &str,
        bytes: Bytes,
        metadata: &ImageMetadata,
    ) -> StorageResult<()>;

    /// Checks many tokens at once. Results come back in input order. A token
    /// whose check fails is logged and reported as missing.
    async fn bulk_exists(&self, tokens: &[Token]) -> Vec<ExistenceCheck> {
        stream::iter(tokens.iter().cloned())
            .map(|token| async move {
                let exists = match self.exists(token.chain_id, &token.address).await {
                    Ok(exists) => exists,
                    Err(e) => {
                        warn!("Storage check failed for {}, treating as missing: {}", token, e);
                        false
                    }
                };
                ExistenceCheck { token, exists }
            })
            .buffered(BULK_EXISTS_CONCURRENCY)
            .collect()
            .await
    }
}
