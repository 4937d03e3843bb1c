//! Domain types shared by providers, storage, the sync pipeline and the web layer.

pub mod image;
pub mod sync_status;
pub mod token;

pub use image::{ImageArtifact, ImageExtension, ImagePayload};
pub use sync_status::{
    SyncPhase, SyncProgress, SyncResult, SyncState, SyncStatus, SyncStatusView, TokenOutcome,
    TokenSyncDetail,
};
pub use token::{Token, is_valid_address, normalize_address};
