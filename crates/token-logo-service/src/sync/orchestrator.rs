use bytes::Bytes;
use chrono::Utc;
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::status::{SyncAdmission, SyncStatusTracker};
use crate::config::SyncConfig;
use crate::errors::AppResult;
use crate::models::{
    ImageArtifact, ImageExtension, ImagePayload, SyncPhase, SyncResult, SyncStatusView, Token,
    TokenOutcome, TokenSyncDetail, is_valid_address,
};
use crate::providers::{LocalImage, LocalImageProvider, ProviderChain, names};
use crate::registry::TokenRegistry;
use crate::storage::{ImageMetadata, ImageStore};
use crate::utils::fetch_bytes_limited;

const PANIC_MESSAGE: &str = "sync task panicked";

/// Pipeline tuning taken from `[sync]`.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub migration_batch_size: usize,
    pub migration_batch_pause: Duration,
    pub download_delay: Duration,
    pub download_concurrency: usize,
    pub max_image_bytes: usize,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            migration_batch_size: config.migration_batch_size.max(1),
            migration_batch_pause: config.migration_batch_pause,
            download_delay: config.download_delay,
            download_concurrency: config.download_concurrency.max(1),
            max_image_bytes: config.max_image_bytes,
        }
    }
}

/// Starts and tracks image syncs. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SyncService {
    registry: Arc<dyn TokenRegistry>,
    store: Arc<dyn ImageStore>,
    local: Arc<LocalImageProvider>,
    providers: Arc<ProviderChain>,
    http: Client,
    tracker: SyncStatusTracker,
    settings: SyncSettings,
}

impl SyncService {
    pub fn new(
        registry: Arc<dyn TokenRegistry>,
        store: Arc<dyn ImageStore>,
        local: Arc<LocalImageProvider>,
        providers: Arc<ProviderChain>,
        http: Client,
        config: &SyncConfig,
    ) -> Self {
        Self {
            registry,
            store,
            local,
            providers,
            http,
            tracker: SyncStatusTracker::new(config.cooldown),
            settings: SyncSettings::from(config),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.tracker.cooldown()
    }

    /// Starts a background sync for `chain_id` unless one ran too recently.
    /// Returns immediately; the pipeline runs on its own task.
    pub async fn start_sync(&self, chain_id: u64) -> SyncAdmission {
        let admission = self.tracker.try_begin(chain_id, Utc::now()).await;
        match &admission {
            SyncAdmission::Started(_) => {
                info!("Starting image sync for chain {}", chain_id);
                self.spawn_pipeline(chain_id);
            }
            SyncAdmission::AlreadyRunning(status) => {
                warn!(
                    "Sync for chain {} still running since {}, not restarting",
                    chain_id, status.start_time
                );
            }
            SyncAdmission::RateLimited { remaining } => {
                debug!(
                    "Sync for chain {} rate limited, {}ms remaining",
                    chain_id,
                    remaining.as_millis()
                );
            }
        }
        admission
    }

    pub async fn sync_status(&self, chain_id: u64) -> Option<SyncStatusView> {
        self.tracker.view(chain_id, Utc::now()).await
    }

    pub async fn all_statuses(&self) -> Vec<SyncStatusView> {
        self.tracker.all(Utc::now()).await
    }

    /// Runs the pipeline on a worker task and records its outcome. A panic in
    /// the worker surfaces as a `JoinError` and becomes a `Failed` status.
    fn spawn_pipeline(&self, chain_id: u64) {
        let service = self.clone();
        tokio::spawn(async move {
            let worker = service.clone();
            let outcome = tokio::spawn(async move { worker.run_pipeline(chain_id).await }).await;

            match outcome {
                Ok(Ok(result)) => {
                    info!(
                        "Sync for chain {} completed in {}ms: {} tokens, {} existing, {} migrated, {} downloaded, {} failed",
                        chain_id,
                        result.duration_ms,
                        result.total_tokens,
                        result.existing_images,
                        result.migrated_from_local,
                        result.downloaded_images,
                        result.failed_downloads
                    );
                    service.tracker.complete(chain_id, result, Utc::now()).await;
                }
                Ok(Err(e)) => {
                    error!("Sync for chain {} failed: {}", chain_id, e);
                    service.tracker.fail(chain_id, e.to_string(), Utc::now()).await;
                }
                Err(join_error) => {
                    let message = if join_error.is_panic() {
                        PANIC_MESSAGE.to_string()
                    } else {
                        format!("sync task aborted: {join_error}")
                    };
                    error!("Sync for chain {} failed: {}", chain_id, message);
                    service.tracker.fail(chain_id, message, Utc::now()).await;
                }
            }
        });
    }

    async fn run_pipeline(&self, chain_id: u64) -> AppResult<SyncResult> {
        let started = Instant::now();

        self.progress(chain_id, SyncPhase::FetchingTokens, 0, 0).await;
        let tokens = self.canonical_tokens(chain_id).await?;
        if tokens.is_empty() {
            info!("Chain {} has no tokens, nothing to sync", chain_id);
            return Ok(SyncResult::empty(started.elapsed()));
        }
        let total = tokens.len();

        self.progress(chain_id, SyncPhase::CheckingStorage, 0, total).await;
        let (present, missing): (Vec<_>, Vec<_>) = self
            .store
            .bulk_exists(&tokens)
            .await
            .into_iter()
            .partition(|check| check.exists);
        let mut details: Vec<TokenSyncDetail> = present
            .iter()
            .map(|check| TokenSyncDetail::exists(check.token.address.clone()))
            .collect();
        let missing: Vec<Token> = missing.into_iter().map(|check| check.token).collect();
        info!(
            "Chain {}: {} of {} tokens already stored",
            chain_id,
            present.len(),
            total
        );

        self.progress(chain_id, SyncPhase::CheckingLocal, 0, missing.len())
            .await;
        let local_hits = if missing.is_empty() {
            Vec::new()
        } else {
            self.local.find_many(&missing).await
        };
        let has_local: HashSet<&Token> = local_hits.iter().map(|hit| &hit.token).collect();
        let still_missing: Vec<Token> = missing
            .iter()
            .filter(|token| !has_local.contains(token))
            .cloned()
            .collect();

        details.extend(self.migrate_local(chain_id, &local_hits).await);
        details.extend(self.download_missing(chain_id, &still_missing).await);

        self.progress(chain_id, SyncPhase::Finalizing, total, total).await;
        Ok(SyncResult::from_details(total, details, started.elapsed()))
    }

    /// Registry tokens, lowercased and de-duplicated. Malformed addresses are dropped.
    async fn canonical_tokens(&self, chain_id: u64) -> AppResult<Vec<Token>> {
        let listed = self.registry.fetch_tokens(chain_id).await?;
        let listed_count = listed.len();

        let mut seen = HashSet::new();
        let tokens: Vec<Token> = listed
            .into_iter()
            .filter(|entry| is_valid_address(entry.address.trim()))
            .map(|entry| Token::new(chain_id, entry.address))
            .filter(|token| seen.insert(token.address.clone()))
            .collect();

        if tokens.len() != listed_count {
            warn!(
                "Chain {}: registry listed {} tokens, {} unique and valid",
                chain_id,
                listed_count,
                tokens.len()
            );
        }
        Ok(tokens)
    }

    async fn migrate_local(&self, chain_id: u64, images: &[LocalImage]) -> Vec<TokenSyncDetail> {
        let total = images.len();
        let mut details = Vec::with_capacity(total);
        if total == 0 {
            return details;
        }

        self.progress(chain_id, SyncPhase::Migrating, 0, total).await;
        for (index, batch) in images.chunks(self.settings.migration_batch_size).enumerate() {
            if index > 0 && !self.settings.migration_batch_pause.is_zero() {
                tokio::time::sleep(self.settings.migration_batch_pause).await;
            }
            details.extend(join_all(batch.iter().map(|image| self.migrate_one(image))).await);
            self.progress(chain_id, SyncPhase::Migrating, details.len(), total)
                .await;
        }

        info!(
            "Chain {}: migrated {} of {} local images",
            chain_id,
            details
                .iter()
                .filter(|d| d.outcome == TokenOutcome::Migrated)
                .count(),
            total
        );
        details
    }

    async fn migrate_one(&self, image: &LocalImage) -> TokenSyncDetail {
        let token = &image.token;
        let path = image.path.to_string_lossy().into_owned();

        let bytes = match self.local.read(image).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read local image {}: {}", path, e);
                return TokenSyncDetail::failed(
                    token.address.clone(),
                    format!("failed to read {path}: {e}"),
                );
            }
        };

        let metadata = ImageMetadata::new(image.extension, names::LOCAL_MIGRATION, Some(path));
        self.persist(token, bytes, &metadata, TokenOutcome::Migrated).await
    }

    async fn download_missing(&self, chain_id: u64, tokens: &[Token]) -> Vec<TokenSyncDetail> {
        let total = tokens.len();
        let mut details = Vec::with_capacity(total);
        if total == 0 {
            return details;
        }

        self.progress(chain_id, SyncPhase::Downloading, 0, total).await;
        for batch in tokens.chunks(self.settings.download_concurrency) {
            let attempts = batch.iter().zip(1u32..).map(|(token, slot)| {
                self.download_one(token, self.settings.download_delay * slot)
            });
            details.extend(join_all(attempts).await);
            self.progress(chain_id, SyncPhase::Downloading, details.len(), total)
                .await;
        }
        details
    }

    /// Resolutions in a batch are staggered so that each one starts at least
    /// `download_delay` after the previous one.
    async fn download_one(&self, token: &Token, start_after: Duration) -> TokenSyncDetail {
        if !start_after.is_zero() {
            tokio::time::sleep(start_after).await;
        }

        let Some(artifact) = self.providers.resolve(token.chain_id, &token.address).await else {
            return TokenSyncDetail::failed(token.address.clone(), "no provider returned an image");
        };
        let ImageArtifact {
            payload,
            provider,
            extension,
            source_path,
        } = artifact;

        let (bytes, extension, origin) = match payload {
            ImagePayload::Buffer(bytes) => (bytes, extension, source_path),
            ImagePayload::Url(url) => {
                match fetch_bytes_limited(&self.http, &url, self.settings.max_image_bytes).await {
                    Ok(bytes) => {
                        let sniffed = ImageExtension::sniff(&bytes).unwrap_or(extension);
                        (bytes, sniffed, Some(url))
                    }
                    Err(e) => {
                        warn!("Download of {} for {} failed: {}", url, token, e);
                        return TokenSyncDetail::failed(
                            token.address.clone(),
                            format!("download from {provider} failed: {e}"),
                        );
                    }
                }
            }
        };

        let metadata = ImageMetadata::new(extension, provider, origin);
        self.persist(token, bytes, &metadata, TokenOutcome::Downloaded)
            .await
    }

    async fn persist(
        &self,
        token: &Token,
        bytes: Bytes,
        metadata: &ImageMetadata,
        outcome: TokenOutcome,
    ) -> TokenSyncDetail {
        match self
            .store
            .put(token.chain_id, &token.address, bytes, metadata)
            .await
        {
            Ok(()) => TokenSyncDetail::succeeded(
                token.address.clone(),
                outcome,
                metadata.provider.clone(),
            ),
            Err(e) => {
                warn!("Failed to store image for {}: {}", token, e);
                TokenSyncDetail::failed(token.address.clone(), format!("storage write failed: {e}"))
            }
        }
    }

    async fn progress(&self, chain_id: u64, phase: SyncPhase, current: usize, total: usize) {
        self.tracker
            .update_progress(chain_id, phase, current, total)
            .await;
    }
}
