//! Client for the external token registry that defines which tokens exist on a chain.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::errors::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegistryToken {
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decimals: Option<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokensResponse {
    Bare(Vec<RegistryToken>),
    Wrapped { tokens: Vec<RegistryToken> },
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenRegistry: Send + Sync {
    /// Canonical token list for a chain. An unreachable registry yields an
    /// empty list; an `Err` aborts the sync that asked for it.
    async fn fetch_tokens(&self, chain_id: u64) -> AppResult<Vec<RegistryToken>>;
}

pub struct HttpTokenRegistry {
    http: Client,
    base_url: String,
}

impl HttpTokenRegistry {
    pub fn new(http: Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenRegistry for HttpTokenRegistry {
    async fn fetch_tokens(&self, chain_id: u64) -> AppResult<Vec<RegistryToken>> {
        let url = format!("{}/tokens", self.base_url);
        let response = match self
            .http
            .get(&url)
            .query(&[("chainId", chain_id)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("Token registry unreachable for chain {}: {}", chain_id, e);
                return Ok(Vec::new());
            }
        };

        if !response.status().is_success() {
            warn!(
                "Token registry returned {} for chain {}",
                response.status(),
                chain_id
            );
            return Ok(Vec::new());
        }

        let body = response.bytes().await?;
        let tokens = match serde_json::from_slice(&body) {
            Ok(TokensResponse::Bare(tokens)) | Ok(TokensResponse::Wrapped { tokens }) => tokens,
            Err(e) => {
                return Err(AppError::external_service(
                    "token registry",
                    format!("malformed token list for chain {chain_id}: {e}"),
                ));
            }
        };
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_support::spawn_upstream;
    use axum::{
        Json, Router, extract::Query, http::StatusCode, response::IntoResponse, routing::get,
    };
    use serde_json::json;
    use std::collections::HashMap;

    async fn registry() -> HttpTokenRegistry {
        let router = Router::new().route(
            "/tokens",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                match params.get("chainId").map(String::as_str) {
                    Some("1") => Json(json!([
                        { "address": "0x6B175474E89094C44Da98b954EedeAC495271d0F", "symbol": "DAI", "name": "Dai", "decimals": 18 }
                    ]))
                    .into_response(),
                    Some("10") => Json(json!({ "tokens": [
                        { "address": "0x4200000000000000000000000000000000000006", "symbol": "WETH" }
                    ]}))
                    .into_response(),
                    Some("56") => "not json".into_response(),
                    _ => StatusCode::SERVICE_UNAVAILABLE.into_response(),
                }
            }),
        );
        HttpTokenRegistry::new(Client::new(), spawn_upstream(router).await)
    }

    #[tokio::test]
    async fn test_fetch_tokens_accepts_both_shapes() {
        let registry = registry().await;

        let mainnet = registry.fetch_tokens(1).await.unwrap();
        assert_eq!(mainnet.len(), 1);
        assert_eq!(mainnet[0].symbol.as_deref(), Some("DAI"));
        assert_eq!(mainnet[0].decimals, Some(18));

        let optimism = registry.fetch_tokens(10).await.unwrap();
        assert_eq!(optimism[0].address, "0x4200000000000000000000000000000000000006");
    }

    #[tokio::test]
    async fn test_unavailable_registry_is_empty_but_garbage_is_an_error() {
        let registry = registry().await;
        assert!(registry.fetch_tokens(999).await.unwrap().is_empty());
        assert!(registry.fetch_tokens(56).await.is_err());
    }
}
