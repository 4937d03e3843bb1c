//! HTTP response types and utilities
//!
//! Every JSON endpoint answers with the [`ApiResponse`] envelope so clients can
//! branch on `success` without looking at the status code.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::AppError;

/// Standard API response wrapper
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (present on success)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Error message (present on failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, String>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn error(message: String) -> ApiResponse<()> {
        ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            details: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Body of a sync request turned away by the per-chain cooldown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedResponse {
    pub success: bool,
    pub error: String,
    pub remaining_time_ms: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// 429 with the remaining wait in the body and a `Retry-After` header in
/// whole seconds, rounded up.
pub fn rate_limited(chain_id: u64, remaining: Duration) -> Response {
    let remaining_ms = u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX);
    let retry_after = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
    let body = RateLimitedResponse {
        success: false,
        error: format!(
            "Sync for chain {} was run recently, retry in {}ms",
            chain_id, remaining_ms
        ),
        remaining_time_ms: remaining_ms,
        timestamp: chrono::Utc::now(),
    };

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> Response {
    let (status, message) = match &error {
        AppError::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
        AppError::NotFound { resource, id } => (
            StatusCode::NOT_FOUND,
            format!("{} with id '{}' not found", resource, id),
        ),
        AppError::Configuration { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Configuration error: {}", message),
        ),
        AppError::ExternalService { service, message } => (
            StatusCode::BAD_GATEWAY,
            format!("External service error ({}): {}", service, message),
        ),
        AppError::Provider(_) | AppError::Http(_) => (
            StatusCode::BAD_GATEWAY,
            "External service communication failed".to_string(),
        ),
        AppError::Storage(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Image storage operation failed".to_string(),
        ),
        AppError::Internal { message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", message),
        ),
    };

    if status.is_server_error() {
        tracing::error!("Request failed: {}", error);
    }

    (status, Json(ApiResponse::<()>::error(message))).into_response()
}

pub fn ok<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}
