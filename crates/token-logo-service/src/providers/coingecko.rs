use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::{ImageProvider, chain_name, names, usable_key};
use crate::config::CoinGeckoConfig;
use crate::errors::ProviderResult;
use crate::models::ImageArtifact;
use crate::utils::send_json;

const API_KEY_HEADER: &str = "x-cg-pro-api-key";

#[derive(Debug, Deserialize)]
struct ContractResponse {
    image: Option<ImageLinks>,
}

#[derive(Debug, Deserialize)]
struct ImageLinks {
    large: Option<String>,
    small: Option<String>,
    thumb: Option<String>,
}

/// Token metadata aggregator; requires a pro API key.
pub struct CoinGeckoProvider {
    http: Client,
    enabled: bool,
    api_key: Option<String>,
    base_url: String,
    platforms: BTreeMap<String, String>,
}

impl CoinGeckoProvider {
    pub fn new(http: Client, config: &CoinGeckoConfig) -> Self {
        Self {
            http,
            enabled: config.enabled,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            platforms: config.platforms.clone(),
        }
    }
}

/// Largest real image; CoinGecko serves `missing_*.png` placeholders for unknown logos.
fn pick_image(links: ImageLinks) -> Option<String> {
    [links.large, links.small, links.thumb]
        .into_iter()
        .flatten()
        .find(|url| !url.is_empty() && !url.contains("missing_"))
}

#[async_trait]
impl ImageProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        names::COINGECKO
    }

    fn is_available(&self) -> bool {
        self.enabled && usable_key(&self.api_key).is_some()
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let (Some(platform), Some(key)) = (
            chain_name(&self.platforms, chain_id),
            usable_key(&self.api_key),
        ) else {
            return Ok(None);
        };

        let url = format!("{}/coins/{}/contract/{}", self.base_url, platform, address);
        let response: Option<ContractResponse> =
            send_json(names::COINGECKO, self.http.get(url).header(API_KEY_HEADER, key)).await?;

        Ok(response
            .and_then(|r| r.image)
            .and_then(pick_image)
            .map(|url| ImageArtifact::from_url(names::COINGECKO, url)))
    }
}
