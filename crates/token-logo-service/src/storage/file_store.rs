use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sandboxed_object_store::{ObjectMetadata, SandboxedStore};

use super::{ImageMetadata, ImageStore, StoredImage, object_key};
use crate::errors::{StorageError, StorageResult};
use crate::models::ImageExtension;

const META_EXTENSION: &str = "extension";
const META_PROVIDER: &str = "provider";
const META_DOWNLOAD_DATE: &str = "downloadDate";
const META_ORIGINAL_URL: &str = "originalUrl";

/// Image store backed by a sandboxed directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct FileImageStore {
    store: SandboxedStore,
}

impl FileImageStore {
    pub fn new(store: SandboxedStore) -> Self {
        Self { store }
    }
}

fn encode_metadata(metadata: &ImageMetadata) -> ObjectMetadata {
    let mut encoded = ObjectMetadata::new();
    encoded.insert(META_EXTENSION.to_string(), metadata.extension.to_string());
    encoded.insert(META_PROVIDER.to_string(), metadata.provider.clone());
    encoded.insert(
        META_DOWNLOAD_DATE.to_string(),
        metadata.download_date.to_rfc3339(),
    );
    if let Some(original) = &metadata.original_url {
        encoded.insert(META_ORIGINAL_URL.to_string(), original.clone());
    }
    encoded
}

/// Rebuilds metadata, sniffing the bytes when the extension entry is missing.
fn decode_metadata(key: &str, raw: &ObjectMetadata, bytes: &[u8]) -> StorageResult<ImageMetadata> {
    let extension = match raw.get(META_EXTENSION) {
        Some(value) => ImageExtension::parse_lenient(value).ok_or_else(|| {
            StorageError::invalid_metadata(key, format!("unsupported extension '{value}'"))
        })?,
        None => ImageExtension::sniff(bytes).unwrap_or(ImageExtension::Png),
    };

    let download_date = raw
        .get(META_DOWNLOAD_DATE)
        .map(|value| {
            DateTime::parse_from_rfc3339(value)
                .map(|date| date.with_timezone(&Utc))
                .map_err(|e| StorageError::invalid_metadata(key, format!("bad downloadDate: {e}")))
        })
        .transpose()?
        .unwrap_or_default();

    Ok(ImageMetadata {
        extension,
        provider: raw.get(META_PROVIDER).cloned().unwrap_or_default(),
        download_date,
        original_url: raw.get(META_ORIGINAL_URL).cloned(),
    })
}

#[async_trait]
impl ImageStore for FileImageStore {
    async fn exists(&self, chain_id: u64, address: &str) -> StorageResult<bool> {
        Ok(self.store.exists(&object_key(chain_id, address)).await?)
    }

    async fn get(&self, chain_id: u64, address: &str) -> StorageResult<Option<StoredImage>> {
        let key = object_key(chain_id, address);
        let Some(object) = self.store.get(&key).await? else {
            return Ok(None);
        };
        let metadata = decode_metadata(&key, &object.metadata, &object.bytes)?;
        Ok(Some(StoredImage {
            bytes: Bytes::from(object.bytes),
            metadata,
        }))
    }

    async fn put(
        &self,
        chain_id: u64,
        address: &str,
        bytes: Bytes,
        metadata: &ImageMetadata,
    ) -> StorageResult<()> {
        let key = object_key(chain_id, address);
        self.store
            .put(&key, &bytes, &encode_metadata(metadata))
            .await?;
        tracing::debug!(
            "Stored image {} ({} bytes, {}, via {})",
            key,
            bytes.len(),
            metadata.extension,
            metadata.provider
        );
        Ok(())
    }
}
