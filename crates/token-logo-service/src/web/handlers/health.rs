//! Health check HTTP handler

use axum::{extract::State, response::Response};
use serde::{Deserialize, Serialize};

use crate::web::{AppState, responses::ok};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    /// Providers that are configured and able to answer
    pub providers: Vec<String>,
}

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Response {
    ok(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        providers: state
            .providers
            .available_providers()
            .into_iter()
            .map(str::to_string)
            .collect(),
    })
}
