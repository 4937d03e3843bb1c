use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{ImageProvider, names, usable_key};
use crate::config::MoralisConfig;
use crate::errors::ProviderResult;
use crate::models::ImageArtifact;
use crate::utils::send_json;

#[derive(Debug, Deserialize)]
struct Erc20Metadata {
    logo: Option<String>,
    thumbnail: Option<String>,
}

/// On-chain indexing API; requires an API key.
pub struct MoralisProvider {
    http: Client,
    enabled: bool,
    api_key: Option<String>,
    base_url: String,
}

impl MoralisProvider {
    pub fn new(http: Client, config: &MoralisConfig) -> Self {
        Self {
            http,
            enabled: config.enabled,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ImageProvider for MoralisProvider {
    fn name(&self) -> &str {
        names::MORALIS
    }

    fn is_available(&self) -> bool {
        self.enabled && usable_key(&self.api_key).is_some()
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let Some(key) = usable_key(&self.api_key) else {
            return Ok(None);
        };

        let request = self
            .http
            .get(format!("{}/erc20/metadata", self.base_url))
            .header("X-API-Key", key)
            .query(&[
                ("chain", format!("0x{chain_id:x}")),
                ("addresses[0]", address.to_string()),
            ]);
        let tokens: Option<Vec<Erc20Metadata>> = send_json(names::MORALIS, request).await?;

        Ok(tokens
            .unwrap_or_default()
            .into_iter()
            .find_map(|token| {
                token
                    .logo
                    .filter(|logo| !logo.is_empty())
                    .or(token.thumbnail.filter(|thumb| !thumb.is_empty()))
            })
            .map(|logo| ImageArtifact::from_url(names::MORALIS, logo)))
    }
}
