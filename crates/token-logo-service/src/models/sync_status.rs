use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SyncState {
    Running,
    Completed,
    Failed,
}

impl SyncState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SyncPhase {
    Initializing,
    FetchingTokens,
    CheckingStorage,
    CheckingLocal,
    Migrating,
    Downloading,
    Finalizing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncProgress {
    pub phase: SyncPhase,
    pub current: usize,
    pub total: usize,
}

impl SyncProgress {
    pub fn new(phase: SyncPhase, current: usize, total: usize) -> Self {
        Self {
            phase,
            current,
            total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOutcome {
    Exists,
    Migrated,
    Downloaded,
    Failed,
}

/// What happened to one token during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSyncDetail {
    pub address: String,
    pub outcome: TokenOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenSyncDetail {
    pub fn exists(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            outcome: TokenOutcome::Exists,
            provider: None,
            error: None,
        }
    }

    pub fn succeeded(
        address: impl Into<String>,
        outcome: TokenOutcome,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            outcome,
            provider: Some(provider.into()),
            error: None,
        }
    }

    pub fn failed(address: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            outcome: TokenOutcome::Failed,
            provider: None,
            error: Some(error.into()),
        }
    }
}

/// Snapshot of a finished sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub total_tokens: usize,
    pub existing_images: usize,
    pub migrated_from_local: usize,
    pub downloaded_images: usize,
    pub failed_downloads: usize,
    pub duration_ms: u64,
    pub details: Vec<TokenSyncDetail>,
}

impl SyncResult {
    /// Builds the aggregate counts from the per-token details.
    pub fn from_details(
        total_tokens: usize,
        details: Vec<TokenSyncDetail>,
        duration: Duration,
    ) -> Self {
        let count = |outcome: TokenOutcome| details.iter().filter(|d| d.outcome == outcome).count();
        Self {
            total_tokens,
            existing_images: count(TokenOutcome::Exists),
            migrated_from_local: count(TokenOutcome::Migrated),
            downloaded_images: count(TokenOutcome::Downloaded),
            failed_downloads: count(TokenOutcome::Failed),
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            details,
        }
    }

    pub fn empty(duration: Duration) -> Self {
        Self::from_details(0, Vec::new(), duration)
    }
}

/// Per-chain sync job record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub chain_id: u64,
    pub state: SyncState,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: SyncProgress,
    /// Present only when `state` is `Completed`
    pub result: Option<SyncResult>,
    /// Present only when `state` is `Failed`
    pub error: Option<String>,
}

impl SyncStatus {
    pub fn running(chain_id: u64, now: DateTime<Utc>) -> Self {
        Self {
            chain_id,
            state: SyncState::Running,
            start_time: now,
            end_time: None,
            progress: SyncProgress::new(SyncPhase::Initializing, 0, 0),
            result: None,
            error: None,
        }
    }

    /// Start time while running, end time once terminal.
    pub fn last_event(&self) -> DateTime<Utc> {
        match self.state {
            SyncState::Running => self.start_time,
            SyncState::Completed | SyncState::Failed => self.end_time.unwrap_or(self.start_time),
        }
    }

    /// Time left before another sync of this chain may start.
    pub fn remaining_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> Duration {
        let elapsed = (now - self.last_event()).to_std().unwrap_or_default();
        cooldown.saturating_sub(elapsed)
    }

    pub fn complete(&mut self, result: SyncResult, now: DateTime<Utc>) {
        self.state = SyncState::Completed;
        self.end_time = Some(now);
        let total = result.total_tokens;
        self.progress = SyncProgress::new(SyncPhase::Completed, total, total);
        self.result = Some(result);
        self.error = None;
    }

    pub fn fail(&mut self, error: impl Into<String>, now: DateTime<Utc>) {
        self.state = SyncState::Failed;
        self.end_time = Some(now);
        self.progress.phase = SyncPhase::Failed;
        self.result = None;
        self.error = Some(error.into());
    }
}

/// A status as reported to clients, with the remaining cooldown computed at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusView {
    #[serde(flatten)]
    pub status: SyncStatus,
    pub remaining_time_ms: u64,
}

impl SyncStatusView {
    pub fn new(status: SyncStatus, now: DateTime<Utc>, cooldown: Duration) -> Self {
        let remaining = status.remaining_cooldown(now, cooldown);
        Self {
            status,
            remaining_time_ms: u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX),
        }
    }
}
