//! Yield-tokenization protocol asset registry.
//!
//! The registry serves the full asset list per chain, so it is fetched once
//! and cached for a few minutes. Besides logos it tells the underlying-asset
//! resolver which addresses are principal tokens.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::cache::TtlCache;
use super::{ImageProvider, names};
use crate::config::ProtocolRegistryConfig;
use crate::errors::ProviderResult;
use crate::models::{ImageArtifact, normalize_address};
use crate::utils::send_json;

const PRINCIPAL_TOKEN_TAG: &str = "PT";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolAsset {
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub pro_icon: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub base_type: Option<String>,
}

impl ProtocolAsset {
    pub fn is_principal_token(&self) -> bool {
        self.tags
            .iter()
            .chain(self.base_type.iter())
            .any(|tag| tag.eq_ignore_ascii_case(PRINCIPAL_TOKEN_TAG))
    }

    pub fn logo(&self) -> Option<&str> {
        self.pro_icon
            .as_deref()
            .or(self.icon.as_deref())
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AssetListResponse {
    Wrapped { assets: Vec<ProtocolAsset> },
    Bare(Vec<ProtocolAsset>),
}

type AssetIndex = Arc<HashMap<String, ProtocolAsset>>;

pub struct ProtocolAssetRegistry {
    http: Client,
    base_url: String,
    supported_chains: Vec<u64>,
    assets: TtlCache<u64, AssetIndex>,
}

impl ProtocolAssetRegistry {
    pub fn new(http: Client, config: &ProtocolRegistryConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            supported_chains: config.supported_chains.clone(),
            assets: TtlCache::new(config.cache_ttl),
        }
    }

    pub fn supports_chain(&self, chain_id: u64) -> bool {
        self.supported_chains.contains(&chain_id)
    }

    /// Looks up an asset by address; `None` for unsupported chains.
    pub async fn lookup(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ProtocolAsset>> {
        if !self.supports_chain(chain_id) {
            return Ok(None);
        }
        let index = self
            .assets
            .get_or_try_load(chain_id, || self.load_assets(chain_id))
            .await?;
        Ok(index.get(&normalize_address(address)).cloned())
    }

    async fn load_assets(&self, chain_id: u64) -> ProviderResult<AssetIndex> {
        let url = format!("{}/v1/{}/assets/all", self.base_url, chain_id);
        let response: Option<AssetListResponse> =
            send_json(names::PROTOCOL_REGISTRY, self.http.get(url)).await?;

        let assets = match response {
            Some(AssetListResponse::Wrapped { assets })
            | Some(AssetListResponse::Bare(assets)) => assets,
            None => Vec::new(),
        };
        tracing::debug!(
            "Loaded {} {} assets for chain {}",
            assets.len(),
            names::PROTOCOL_REGISTRY,
            chain_id
        );
        Ok(Arc::new(
            assets
                .into_iter()
                .map(|asset| (normalize_address(&asset.address), asset))
                .collect(),
        ))
    }
}

pub struct ProtocolRegistryProvider {
    registry: Arc<ProtocolAssetRegistry>,
    enabled: bool,
}

impl ProtocolRegistryProvider {
    pub fn new(registry: Arc<ProtocolAssetRegistry>, enabled: bool) -> Self {
        Self { registry, enabled }
    }
}

#[async_trait]
impl ImageProvider for ProtocolRegistryProvider {
    fn name(&self) -> &str {
        names::PROTOCOL_REGISTRY
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let asset = self.registry.lookup(chain_id, address).await?;
        Ok(asset
            .as_ref()
            .and_then(ProtocolAsset::logo)
            .map(|logo| ImageArtifact::from_url(names::PROTOCOL_REGISTRY, logo)))
    }
}
