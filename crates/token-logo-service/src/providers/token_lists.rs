//! Community token lists in the Uniswap token-list format.

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::cache::TtlCache;
use super::{ImageProvider, names};
use crate::config::TokenListsConfig;
use crate::errors::ProviderResult;
use crate::models::{ImageArtifact, normalize_address};
use crate::utils::send_json;

const IPFS_GATEWAY: &str = "https://ipfs.io/ipfs/";

#[derive(Debug, Deserialize)]
struct TokenList {
    #[serde(default)]
    tokens: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListEntry {
    chain_id: u64,
    address: String,
    #[serde(rename = "logoURI")]
    logo_uri: Option<String>,
    #[serde(default)]
    extensions: Option<Extensions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Extensions {
    #[serde(default)]
    bridge_info: HashMap<String, BridgeInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BridgeInfo {
    token_address: Option<String>,
}

/// `(chainId, address)` to logo URL for one list.
type ListIndex = Arc<HashMap<(u64, String), String>>;

fn normalize_logo(logo: &str) -> Option<String> {
    let logo = logo.trim();
    if logo.is_empty() {
        return None;
    }
    Some(match logo.strip_prefix("ipfs://") {
        Some(cid) => format!("{IPFS_GATEWAY}{}", cid.trim_start_matches("ipfs/")),
        None => logo.to_string(),
    })
}

/// Direct entries win over bridged cross-references to the same token.
fn build_index(list: TokenList) -> HashMap<(u64, String), String> {
    let mut index = HashMap::new();
    let mut bridged = Vec::new();

    for entry in list.tokens {
        let Some(logo) = entry.logo_uri.as_deref().and_then(normalize_logo) else {
            continue;
        };
        if let Some(extensions) = entry.extensions {
            for (chain, info) in extensions.bridge_info {
                if let (Ok(chain_id), Some(address)) = (chain.parse::<u64>(), info.token_address) {
                    bridged.push(((chain_id, normalize_address(&address)), logo.clone()));
                }
            }
        }
        index.insert((entry.chain_id, normalize_address(&entry.address)), logo);
    }

    for (key, logo) in bridged {
        index.entry(key).or_insert(logo);
    }
    index
}

/// Scans a fixed set of token lists; the first list with a logo wins.
pub struct TokenListsProvider {
    http: Client,
    enabled: bool,
    urls: Vec<String>,
    lists: TtlCache<String, ListIndex>,
}

impl TokenListsProvider {
    pub fn new(http: Client, config: &TokenListsConfig) -> Self {
        Self {
            http,
            enabled: config.enabled,
            urls: config.urls.clone(),
            lists: TtlCache::new(config.cache_ttl),
        }
    }

    async fn load_list(&self, url: &str) -> ProviderResult<ListIndex> {
        let list: Option<TokenList> = send_json(names::TOKEN_LISTS, self.http.get(url)).await?;
        Ok(Arc::new(list.map(build_index).unwrap_or_default()))
    }

    /// A list that fails to load is skipped for this lookup and retried next time.
    async fn list(&self, url: &str) -> Option<ListIndex> {
        match self
            .lists
            .get_or_try_load(url.to_string(), || self.load_list(url))
            .await
        {
            Ok(index) => Some(index),
            Err(e) => {
                warn!("Token list {} unavailable: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl ImageProvider for TokenListsProvider {
    fn name(&self) -> &str {
        names::TOKEN_LISTS
    }

    fn is_available(&self) -> bool {
        self.enabled && !self.urls.is_empty()
    }

    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>> {
        let key = (chain_id, normalize_address(address));
        let lists = join_all(self.urls.iter().map(|url| self.list(url))).await;

        Ok(lists
            .into_iter()
            .flatten()
            .find_map(|index| index.get(&key).cloned())
            .map(|logo| ImageArtifact::from_url(names::TOKEN_LISTS, logo)))
    }
}
