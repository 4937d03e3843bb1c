//! Sync trigger and status endpoints

use axum::{
    extract::{Path, State},
    response::Response,
};

use super::parse_chain_id;
use crate::errors::AppError;
use crate::sync::SyncAdmission;
use crate::web::{
    AppState,
    responses::{handle_error, ok, rate_limited},
};

/// `GET /sync/{chain_id}`
///
/// Starts a sync unless the chain is inside its cooldown window. A sync that
/// is still running is reported as-is rather than restarted.
pub async fn trigger_sync(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Response {
    let chain_id = match parse_chain_id(&chain_id) {
        Ok(chain_id) => chain_id,
        Err(e) => return handle_error(e),
    };

    match state.sync_service.start_sync(chain_id).await {
        SyncAdmission::RateLimited { remaining } => rate_limited(chain_id, remaining),
        SyncAdmission::Started(_) | SyncAdmission::AlreadyRunning(_) => {
            match state.sync_service.sync_status(chain_id).await {
                Some(view) => ok(view),
                None => handle_error(AppError::internal(format!(
                    "sync status for chain {chain_id} disappeared after admission"
                ))),
            }
        }
    }
}

/// `GET /sync/{chain_id}/status`
pub async fn sync_status(
    State(state): State<AppState>,
    Path(chain_id): Path<String>,
) -> Response {
    let chain_id = match parse_chain_id(&chain_id) {
        Ok(chain_id) => chain_id,
        Err(e) => return handle_error(e),
    };

    match state.sync_service.sync_status(chain_id).await {
        Some(view) => ok(view),
        None => handle_error(AppError::not_found("sync status", chain_id.to_string())),
    }
}

/// `GET /sync`
pub async fn list_sync_statuses(State(state): State<AppState>) -> Response {
    ok(state.sync_service.all_statuses().await)
}
