use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use super::cache::TtlCache;
use super::{ImageProvider, names};
use crate::config::DexTokenListConfig;
use crate::errors::ProviderResult;
use crate::models::{ImageArtifact, normalize_address};
use crate::utils::send_json;

#[derive(Debug, Deserialize)]
struct ListedToken {
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
}

type LogoIndex = Arc<HashMap<String, String>>;

/// Per-chain token list published by a DEX aggregator.
pub struct DexTokenListProvider {
    http: Client,
    enabled: bool,
    base_url: String,
    excluded_chains: Vec<u64>,
    lists: TtlCache<u64, LogoIndex>,
}

impl DexTokenListProvider {
    pub fn new(http: Client, config: &DexTokenListConfig) -> Self {
        Self {
            http,
            enabled: config.enabled,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            excluded_chains: config.excluded_chains.clone(),
            lists: TtlCache::new(config.cache_ttl),
        }
    }

    async fn load_list(&self, chain_id: u64) -> ProviderResult<LogoIndex> {
        let url = format!("{}/{}", self.base_url, chain_id);
        let listed: Option<HashMap<String, ListedToken>> =
            send_json(names::DEX_TOKEN_LIST, self.http.get(url)).await?;

        let index: HashMap<String, String> = listed
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(address, token)| {
                token
                    .logo_uri
                    .filter(|logo| !logo.is_empty())
                    .map(|logo| (normalize_address(&address), logo))
            })
            .collect();
        tracing::debug!(
            "Loaded {} logos from {} list for chain {}",
            index.len(),
            names::DEX_TOKEN_LIST,
            chain_id
        );
        Ok(Arc::new(index))
    }
}

#[async_trait]
impl ImageProvider for DexTokenListProvider {
    fn name(&self) -> &str {
        names::DEX_TOKEN_LIST
    }

    fn is_available(&self) -> bool {
        self.enabled
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        if self.excluded_chains.contains(&chain_id) {
            return Ok(None);
        }
        let index = self
            .lists
            .get_or_try_load(chain_id, || self.load_list(chain_id))
            .await?;
        Ok(index
            .get(address)
            .map(|logo| ImageArtifact::from_url(names::DEX_TOKEN_LIST, logo.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_support::spawn_upstream;
    use axum::{Json, Router, extract::Path, routing::get};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_list_is_fetched_once_and_excluded_chains_skipped() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/{chain}",
            get(move |Path(chain): Path<u64>| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Json(json!({
                        "0x6B175474E89094C44Da98b954EedeAC495271d0F": {
                            "symbol": "DAI",
                            "logoURI": format!("https://tokens.example/{chain}/dai.png")
                        },
                        "0x0000000000000000000000000000000000000002": { "symbol": "NOLOGO" }
                    }))
                }
            }),
        );
        let base = spawn_upstream(router).await;
        let provider = DexTokenListProvider::new(
            Client::new(),
            &DexTokenListConfig {
                base_url: base,
                excluded_chains: vec![324],
                ..DexTokenListConfig::default()
            },
        );

        let dai = "0x6b175474e89094c44da98b954eedeac495271d0f";
        let hit = provider.fetch_image(1, dai).await.unwrap().unwrap();
        assert_eq!(hit.url(), Some("https://tokens.example/1/dai.png"));

        assert!(provider
            .fetch_image(1, "0x0000000000000000000000000000000000000002")
            .await
            .unwrap()
            .is_none());
        assert!(provider.fetch_image(324, dai).await.unwrap().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
