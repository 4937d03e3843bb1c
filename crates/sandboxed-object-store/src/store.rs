//! Core sandboxed object store implementation.

use crate::{
    error::{Result, SandboxedStoreError},
    security::{set_secure_permissions, validate_key, validate_path_within_sandbox},
};

use std::{
    collections::BTreeMap,
    ffi::OsString,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
};
use tokio::fs;

/// Suffix appended to an object's file name for its metadata sidecar.
pub const METADATA_SUFFIX: &str = ".meta.json";

/// String metadata persisted alongside every object.
pub type ObjectMetadata = BTreeMap<String, String>;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// An object read back from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub metadata: ObjectMetadata,
}

/// Filesystem-backed object store restricted to a single base directory.
#[derive(Debug, Clone)]
pub struct SandboxedStore {
    base_dir: PathBuf,
    canonical_base: PathBuf,
}

impl SandboxedStore {
    /// Create a new builder.
    #[must_use]
    pub fn builder() -> SandboxedStoreBuilder {
        SandboxedStoreBuilder::new()
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_dir
    }

    /// Writes an object and its metadata, replacing any previous version.
    ///
    /// Both files are written to a temporary name first and renamed into
    /// place, so readers never observe a partially written object.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or escapes the sandbox, the
    /// metadata cannot be encoded, or the underlying writes fail.
    pub async fn put(&self, key: &str, bytes: &[u8], metadata: &ObjectMetadata) -> Result<()> {
        let object_path = self.resolve(key)?;
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| SandboxedStoreError::DirectoryCreation {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            validate_path_within_sandbox(parent, &self.canonical_base)?;
        }

        let encoded =
            serde_json::to_vec(metadata).map_err(|source| SandboxedStoreError::Metadata {
                key: key.to_string(),
                source,
            })?;

        write_atomic(&metadata_path(&object_path), &encoded).await?;
        write_atomic(&object_path, bytes).await?;

        tracing::debug!("Stored object {} ({} bytes)", key, bytes.len());
        Ok(())
    }

    /// Reads an object and its metadata. Returns `None` when the object does
    /// not exist. A missing sidecar yields empty metadata.
    ///
    /// # Errors
    /// Returns an error if the key is invalid, the read fails for a reason
    /// other than absence, or the sidecar is not valid JSON.
    pub async fn get(&self, key: &str) -> Result<Option<StoredObject>> {
        let object_path = self.resolve(key)?;
        let bytes = match fs::read(&object_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let metadata = self.read_metadata(key, &object_path).await?;
        Ok(Some(StoredObject {
            key: key.to_string(),
            bytes,
            metadata,
        }))
    }

    /// Reads only the metadata of an object, or `None` if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or the sidecar cannot be read.
    pub async fn head(&self, key: &str) -> Result<Option<ObjectMetadata>> {
        let object_path = self.resolve(key)?;
        if !fs::try_exists(&object_path).await? {
            return Ok(None);
        }
        self.read_metadata(key, &object_path).await.map(Some)
    }

    /// Checks whether an object exists.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or escapes the sandbox.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let object_path = self.resolve(key)?;
        Ok(fs::try_exists(&object_path).await?)
    }

    /// Removes an object and its sidecar. Returns whether the object existed.
    ///
    /// # Errors
    /// Returns an error if the key is invalid or a removal fails for a reason
    /// other than absence.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let object_path = self.resolve(key)?;
        let existed = remove_if_present(&object_path).await?;
        remove_if_present(&metadata_path(&object_path)).await?;
        Ok(existed)
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = validate_key(key)?;
        let full_path = self.base_dir.join(relative);
        validate_path_within_sandbox(&full_path, &self.canonical_base)?;
        Ok(full_path)
    }

    async fn read_metadata(&self, key: &str, object_path: &Path) -> Result<ObjectMetadata> {
        match fs::read(metadata_path(object_path)).await {
            Ok(raw) => {
                serde_json::from_slice(&raw).map_err(|source| SandboxedStoreError::Metadata {
                    key: key.to_string(),
                    source,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ObjectMetadata::new()),
            Err(e) => Err(e.into()),
        }
    }
}

fn metadata_path(object_path: &Path) -> PathBuf {
    let mut name = object_path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(METADATA_SUFFIX);
    object_path.with_file_name(name)
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let mut temp_name = path.file_name().map(OsString::from).unwrap_or_default();
    temp_name.push(format!(
        ".tmp-{}-{}",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, contents).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Builder for configuring a `SandboxedStore`.
#[derive(Debug)]
pub struct SandboxedStoreBuilder {
    base_directory: Option<PathBuf>,
    secure_permissions: bool,
}

impl SandboxedStoreBuilder {
    fn new() -> Self {
        Self {
            base_directory: None,
            secure_permissions: true,
        }
    }

    /// Set the base directory for object storage.
    #[must_use]
    pub fn base_directory<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.base_directory = Some(path.into());
        self
    }

    /// Restrict the base directory to the current user (default: on).
    #[must_use]
    pub fn secure_permissions(mut self, enabled: bool) -> Self {
        self.secure_permissions = enabled;
        self
    }

    /// Build the `SandboxedStore`, creating the base directory if needed.
    ///
    /// # Errors
    /// Returns an error if the base directory is not set, cannot be created,
    /// or cannot be secured.
    pub async fn build(self) -> Result<SandboxedStore> {
        let base_dir = self
            .base_directory
            .ok_or_else(|| SandboxedStoreError::Configuration {
                message: "Base directory is required".to_string(),
            })?;

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| SandboxedStoreError::DirectoryCreation {
                path: base_dir.clone(),
                source: e,
            })?;

        if self.secure_permissions {
            set_secure_permissions(&base_dir).await?;
        }

        let canonical_base =
            base_dir
                .canonicalize()
                .map_err(|e| SandboxedStoreError::PathValidation {
                    path: base_dir.clone(),
                    reason: format!("Failed to canonicalize base directory: {e}"),
                })?;

        tracing::info!("SandboxedStore initialized - base_dir: {:?}", base_dir);

        Ok(SandboxedStore {
            base_dir,
            canonical_base,
        })
    }
}
