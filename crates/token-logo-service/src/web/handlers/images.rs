//! Token image serving

use axum::{
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::time::Duration;
use tracing::{debug, warn};

use super::{parse_address, parse_chain_id};
use crate::assets::ImageAssets;
use crate::errors::AppResult;
use crate::web::{AppState, responses::handle_error};

/// `GET /{chain_id}/{address}`
///
/// Serves the stored image with the long cache lifetime. Tokens without a
/// stored image get the bundled placeholder with a short lifetime so a later
/// sync shows up quickly.
pub async fn serve_token_image(
    State(state): State<AppState>,
    Path((chain_id, address)): Path<(String, String)>,
) -> Response {
    let (chain_id, address) = match validate(&chain_id, &address) {
        Ok(parsed) => parsed,
        Err(e) => return handle_error(e),
    };

    match state.image_store.get(chain_id, &address).await {
        Ok(Some(image)) => {
            debug!(
                "Serving {} image for {}:{} ({} bytes)",
                image.metadata.provider,
                chain_id,
                address,
                image.bytes.len()
            );
            let content_type = image.content_type();
            image_response(image.bytes, content_type, state.web.image_cache_max_age)
        }
        Ok(None) => default_image_response(state.web.fallback_cache_max_age),
        Err(e) => {
            warn!("Failed to read image for {}:{}: {}", chain_id, address, e);
            default_image_response(state.web.fallback_cache_max_age)
        }
    }
}

fn validate(chain_id: &str, address: &str) -> AppResult<(u64, String)> {
    Ok((parse_chain_id(chain_id)?, parse_address(address)?))
}

fn default_image_response(max_age: Duration) -> Response {
    match ImageAssets::default_image() {
        Some(image) => image_response(image.bytes, image.content_type, max_age),
        None => (StatusCode::NOT_FOUND, "Image not found").into_response(),
    }
}

fn image_response(bytes: Bytes, content_type: &'static str, max_age: Duration) -> Response {
    let cache_control = format!("public, max-age={}", max_age.as_secs());
    let mut response = bytes.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&cache_control) {
        headers.insert(header::CACHE_CONTROL, value);
    }
    response
}
