//! Shared fakes for the integration tests: a fixed token registry, a
//! map-backed image provider, a store that can fail chosen addresses and a
//! local upstream that serves image bytes.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{Router, extract::Path, http::StatusCode, response::IntoResponse, routing::get};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tempfile::TempDir;

use sandboxed_object_store::{SandboxedStore, SandboxedStoreError};
use token_logo_service::{
    config::SyncConfig,
    errors::{AppResult, ProviderResult, StorageError, StorageResult},
    models::{ImageArtifact, ImageExtension, SyncStatus, normalize_address},
    providers::{ImageProvider, LocalImageProvider, ProviderChain},
    registry::{RegistryToken, TokenRegistry},
    storage::{FileImageStore, ImageMetadata, ImageStore, StoredImage},
    sync::SyncService,
};

/// Smallest byte prefix `infer` recognises as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x06\0\0\0";
pub const SCRIPTED: &str = "scripted";

pub struct StaticRegistry {
    tokens: HashMap<u64, Vec<String>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self {
            tokens: HashMap::new(),
        }
    }

    pub fn with_chain(mut self, chain_id: u64, addresses: &[&str]) -> Self {
        self.tokens
            .insert(chain_id, addresses.iter().map(|a| a.to_string()).collect());
        self
    }
}

#[async_trait]
impl TokenRegistry for StaticRegistry {
    async fn fetch_tokens(&self, chain_id: u64) -> AppResult<Vec<RegistryToken>> {
        Ok(self
            .tokens
            .get(&chain_id)
            .into_iter()
            .flatten()
            .map(|address| RegistryToken {
                address: address.clone(),
                symbol: None,
                name: None,
                decimals: None,
            })
            .collect())
    }
}

/// Provider answering from a fixed address → artifact map.
pub struct MapProvider {
    images: HashMap<String, ImageArtifact>,
    calls: Mutex<Vec<Instant>>,
}

impl MapProvider {
    pub fn new() -> Self {
        Self {
            images: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_url(mut self, address: &str, url: impl Into<String>) -> Self {
        self.images.insert(
            normalize_address(address),
            ImageArtifact::from_url(SCRIPTED, url),
        );
        self
    }

    pub fn with_buffer(
        mut self,
        address: &str,
        bytes: &'static [u8],
        extension: ImageExtension,
    ) -> Self {
        self.images.insert(
            normalize_address(address),
            ImageArtifact::from_buffer(SCRIPTED, Bytes::from_static(bytes), extension, None),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// When each lookup started, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageProvider for MapProvider {
    fn name(&self) -> &str {
        SCRIPTED
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn fetch_image(
        &self,
        _chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        self.calls.lock().unwrap().push(Instant::now());
        Ok(self.images.get(address).cloned())
    }
}

/// File store that fails existence checks or writes for chosen addresses.
pub struct FlakyStore {
    inner: FileImageStore,
    rejected: HashSet<String>,
    unreadable: HashSet<String>,
    puts: AtomicUsize,
}

impl FlakyStore {
    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for FlakyStore {
    async fn exists(&self, chain_id: u64, address: &str) -> StorageResult<bool> {
        if self.unreadable.contains(&normalize_address(address)) {
            return Err(StorageError::Store(SandboxedStoreError::Permission {
                operation: "exists".to_string(),
                path: PathBuf::from(format!("{chain_id}/{address}/image")),
            }));
        }
        self.inner.exists(chain_id, address).await
    }

    async fn get(&self, chain_id: u64, address: &str) -> StorageResult<Option<StoredImage>> {
        self.inner.get(chain_id, address).await
    }

    async fn put(
        &self,
        chain_id: u64,
        address: &str,
        bytes: Bytes,
        metadata: &ImageMetadata,
    ) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.rejected.contains(&normalize_address(address)) {
            return Err(StorageError::WriteRejected {
                key: format!("{chain_id}/{address}"),
                message: "disk full".to_string(),
            });
        }
        self.inner.put(chain_id, address, bytes, metadata).await
    }
}

pub struct Harness {
    pub service: SyncService,
    pub store: Arc<FlakyStore>,
    pub provider: Arc<MapProvider>,
    pub chain: Arc<ProviderChain>,
    pub local_root: PathBuf,
    _dir: TempDir,
}

/// Knobs for a [`Harness`]. The defaults sync quickly with no pacing.
pub struct HarnessOptions {
    /// Addresses whose writes fail
    pub rejected_writes: Vec<&'static str>,
    /// Addresses whose existence checks fail
    pub failing_checks: Vec<&'static str>,
    pub sync: SyncConfig,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            rejected_writes: Vec::new(),
            failing_checks: Vec::new(),
            sync: SyncConfig {
                cooldown: Duration::from_secs(60),
                migration_batch_size: 2,
                migration_batch_pause: Duration::ZERO,
                download_delay: Duration::ZERO,
                download_concurrency: 2,
                ..SyncConfig::default()
            },
        }
    }
}

impl HarnessOptions {
    pub fn cooldown(mut self, cooldown: Duration) -> Self {
        self.sync.cooldown = cooldown;
        self
    }

    pub fn reject_writes(mut self, addresses: &[&'static str]) -> Self {
        self.rejected_writes.extend_from_slice(addresses);
        self
    }

    pub fn fail_checks(mut self, addresses: &[&'static str]) -> Self {
        self.failing_checks.extend_from_slice(addresses);
        self
    }
}

impl Harness {
    pub async fn new(registry: StaticRegistry, provider: MapProvider) -> Self {
        Self::build(registry, provider, HarnessOptions::default()).await
    }

    pub async fn build(
        registry: StaticRegistry,
        provider: MapProvider,
        options: HarnessOptions,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let local_root = dir.path().join("local");
        let object_store = SandboxedStore::builder()
            .base_directory(dir.path().join("images"))
            .build()
            .await
            .unwrap();
        let store = Arc::new(FlakyStore {
            inner: FileImageStore::new(object_store),
            rejected: options.rejected_writes.iter().map(|a| normalize_address(a)).collect(),
            unreadable: options.failing_checks.iter().map(|a| normalize_address(a)).collect(),
            puts: AtomicUsize::new(0),
        });

        let local = Arc::new(LocalImageProvider::new(&local_root));
        let provider = Arc::new(provider);
        let chain = Arc::new(ProviderChain::new(vec![
            local.clone() as Arc<dyn ImageProvider>,
            provider.clone() as Arc<dyn ImageProvider>,
        ]));

        let service = SyncService::new(
            Arc::new(registry),
            store.clone(),
            local,
            chain.clone(),
            reqwest::Client::new(),
            &options.sync,
        );

        Self {
            service,
            store,
            provider,
            chain,
            local_root,
            _dir: dir,
        }
    }

    /// Drops an `image.{ext}` file into the local tree for a token.
    pub fn write_local(
        &self,
        chain_id: u64,
        address: &str,
        extension: ImageExtension,
        bytes: &[u8],
    ) {
        let dir = self
            .local_root
            .join(chain_id.to_string())
            .join(normalize_address(address));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(format!("image.{extension}")), bytes).unwrap();
    }

    pub async fn seed(&self, chain_id: u64, address: &str) {
        self.store
            .put(
                chain_id,
                address,
                Bytes::from_static(PNG_BYTES),
                &ImageMetadata::new(ImageExtension::Png, "seed", None),
            )
            .await
            .unwrap();
    }

    pub async fn wait_for_terminal(&self, chain_id: u64) -> SyncStatus {
        wait_for_terminal(&self.service, chain_id).await
    }
}

pub async fn wait_for_terminal(service: &SyncService, chain_id: u64) -> SyncStatus {
    for _ in 0..500 {
        if let Some(view) = service.sync_status(chain_id).await
            && view.status.state.is_terminal()
        {
            return view.status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("sync for chain {chain_id} did not finish");
}

/// Serves `/logos/{name}` with PNG bytes and 404 for anything else.
pub async fn spawn_image_upstream() -> String {
    async fn logo(Path(_name): Path<String>) -> impl IntoResponse {
        ([("content-type", "image/png")], PNG_BYTES)
    }

    let router = Router::new()
        .route("/logos/{name}", get(logo))
        .fallback(|| async { StatusCode::NOT_FOUND });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}
