use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;

use super::{ImageProvider, chain_name, names, usable_key};
use crate::config::AlchemyConfig;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::ImageArtifact;
use crate::utils::send_json;

#[derive(Debug, Deserialize)]
struct MetadataResponse {
    result: Option<TokenMetadata>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenMetadata {
    logo: Option<String>,
}

/// Chain RPC provider's token metadata endpoint (`alchemy_getTokenMetadata`).
pub struct AlchemyProvider {
    http: Client,
    enabled: bool,
    api_key: Option<String>,
    url_template: String,
    networks: BTreeMap<String, String>,
}

impl AlchemyProvider {
    pub fn new(http: Client, config: &AlchemyConfig) -> Self {
        Self {
            http,
            enabled: config.enabled,
            api_key: config.api_key.clone(),
            url_template: config.url_template.trim_end_matches('/').to_string(),
            networks: config.networks.clone(),
        }
    }

    fn endpoint(&self, network: &str, key: &str) -> String {
        format!("{}/{}", self.url_template.replace("{network}", network), key)
    }
}

#[async_trait]
impl ImageProvider for AlchemyProvider {
    fn name(&self) -> &str {
        names::ALCHEMY
    }

    fn is_available(&self) -> bool {
        self.enabled && usable_key(&self.api_key).is_some()
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let (Some(network), Some(key)) = (
            chain_name(&self.networks, chain_id),
            usable_key(&self.api_key),
        ) else {
            return Ok(None);
        };

        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "alchemy_getTokenMetadata",
            "params": [address]
        });
        let response: Option<MetadataResponse> = send_json(
            names::ALCHEMY,
            self.http.post(self.endpoint(network, key)).json(&body),
        )
        .await?;

        let Some(response) = response else {
            return Ok(None);
        };
        if let Some(error) = response.error {
            return Err(ProviderError::parse(names::ALCHEMY, error.to_string()));
        }
        Ok(response
            .result
            .and_then(|metadata| metadata.logo)
            .filter(|logo| !logo.is_empty())
            .map(|logo| ImageArtifact::from_url(names::ALCHEMY, logo)))
    }
}
