//! Per-chain image sync: reconcile the registry's tokens against storage,
//! migrate local copies, and download the rest through the provider chain.

pub mod orchestrator;
pub mod status;

pub use orchestrator::{SyncService, SyncSettings};
pub use status::{SyncAdmission, SyncStatusTracker};
