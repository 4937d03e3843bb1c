use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::models::{SyncPhase, SyncResult, SyncState, SyncStatus, SyncStatusView};

/// Outcome of asking to start a sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAdmission {
    /// A fresh `Running` status was recorded; the caller must launch the pipeline.
    Started(SyncStatus),
    /// A sync is still marked running past the cooldown; returned unchanged.
    AlreadyRunning(SyncStatus),
    /// Too soon after the last sync of this chain.
    RateLimited { remaining: Duration },
}

/// In-memory record of the latest sync per chain.
#[derive(Clone)]
pub struct SyncStatusTracker {
    statuses: Arc<RwLock<HashMap<u64, SyncStatus>>>,
    cooldown: Duration,
}

impl SyncStatusTracker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            statuses: Arc::new(RwLock::new(HashMap::new())),
            cooldown,
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Admission check and status creation happen under one write lock, so
    /// two concurrent requests for the same chain cannot both start a sync.
    pub async fn try_begin(&self, chain_id: u64, now: DateTime<Utc>) -> SyncAdmission {
        let mut statuses = self.statuses.write().await;

        if let Some(existing) = statuses.get(&chain_id) {
            let remaining = existing.remaining_cooldown(now, self.cooldown);
            if !remaining.is_zero() {
                return SyncAdmission::RateLimited { remaining };
            }
            if existing.state == SyncState::Running {
                return SyncAdmission::AlreadyRunning(existing.clone());
            }
        }

        let status = SyncStatus::running(chain_id, now);
        statuses.insert(chain_id, status.clone());
        SyncAdmission::Started(status)
    }

    pub async fn update_progress(
        &self,
        chain_id: u64,
        phase: SyncPhase,
        current: usize,
        total: usize,
    ) {
        let mut statuses = self.statuses.write().await;
        if let Some(status) = statuses.get_mut(&chain_id)
            && status.state == SyncState::Running
        {
            status.progress.phase = phase;
            status.progress.current = current;
            status.progress.total = total;
        }
    }

    /// Moves a running sync to `Completed`. Terminal statuses are left alone.
    pub async fn complete(&self, chain_id: u64, result: SyncResult, now: DateTime<Utc>) {
        let mut statuses = self.statuses.write().await;
        if let Some(status) = statuses.get_mut(&chain_id)
            && status.state == SyncState::Running
        {
            status.complete(result, now);
        }
    }

    /// Moves a running sync to `Failed`. Terminal statuses are left alone.
    pub async fn fail(&self, chain_id: u64, error: impl Into<String>, now: DateTime<Utc>) {
        let mut statuses = self.statuses.write().await;
        if let Some(status) = statuses.get_mut(&chain_id)
            && status.state == SyncState::Running
        {
            status.fail(error, now);
        }
    }

    pub async fn get(&self, chain_id: u64) -> Option<SyncStatus> {
        self.statuses.read().await.get(&chain_id).cloned()
    }

    pub async fn view(&self, chain_id: u64, now: DateTime<Utc>) -> Option<SyncStatusView> {
        self.get(chain_id)
            .await
            .map(|status| SyncStatusView::new(status, now, self.cooldown))
    }

    /// All known statuses ordered by chain id.
    pub async fn all(&self, now: DateTime<Utc>) -> Vec<SyncStatusView> {
        let statuses = self.statuses.read().await;
        let mut views: Vec<SyncStatusView> = statuses
            .values()
            .cloned()
            .map(|status| SyncStatusView::new(status, now, self.cooldown))
            .collect();
        views.sort_by_key(|view| view.status.chain_id);
        views
    }
}
