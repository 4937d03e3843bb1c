use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::errors::{AppError, AppResult, ProviderError, ProviderResult};

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Shared reqwest client with a total request timeout.
pub fn build_client(timeout: Duration) -> AppResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::configuration(format!("Failed to create HTTP client: {e}")))
}

/// Sends a request and decodes a JSON body. A 404 is reported as `None`.
pub async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: RequestBuilder,
) -> ProviderResult<Option<T>> {
    let response = request.send().await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND {
        debug!("{} returned 404", provider);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(ProviderError::status(provider, status));
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map(Some)
        .map_err(|e| ProviderError::parse(provider, e.to_string()))
}

/// Downloads a body, refusing anything larger than `max_bytes`.
pub async fn fetch_bytes_limited(client: &Client, url: &str, max_bytes: usize) -> AppResult<Bytes> {
    let service = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "image host".to_string());

    let mut response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::external_service(
            service,
            format!(
                "HTTP {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ),
        ));
    }

    if let Some(length) = response.content_length()
        && length > max_bytes as u64
    {
        return Err(AppError::external_service(
            service,
            format!("image is {length} bytes, limit is {max_bytes}"),
        ));
    }

    let mut body = BytesMut::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > max_bytes {
            return Err(AppError::external_service(
                service,
                format!("image exceeds {max_bytes} bytes"),
            ));
        }
        body.extend_from_slice(&chunk);
    }

    if body.is_empty() {
        return Err(AppError::external_service(service, "empty response body"));
    }

    Ok(body.freeze())
}
