//! Image providers and the priority chain that resolves them.
//!
//! Each provider wraps one upstream source of token logos. Providers report
//! "no image" as `Ok(None)`; errors are only for genuine failures and are
//! swallowed by [`ProviderChain`] so one bad upstream never blocks another.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{ProvidersConfig, chain_entry};
use crate::errors::{AppError, AppResult, ProviderResult};
use crate::models::{ImageArtifact, is_valid_address, normalize_address};

pub mod alchemy;
pub mod cache;
pub mod chain;
pub mod coingecko;
pub mod dex_token_list;
pub mod local;
pub mod moralis;
pub mod protocol_registry;
pub mod rpc;
pub mod token_lists;
pub mod underlying;

pub use chain::ProviderChain;
pub use local::{LocalImage, LocalImageProvider};

/// Provider tags recorded in stored image metadata.
pub mod names {
    pub const LOCAL: &str = "local";
    pub const LOCAL_MIGRATION: &str = "local-migration";
    pub const COINGECKO: &str = "coingecko";
    pub const DEX_TOKEN_LIST: &str = "1inch";
    pub const ALCHEMY: &str = "alchemy";
    pub const MORALIS: &str = "moralis";
    pub const PROTOCOL_REGISTRY: &str = "pendle";
    pub const TOKEN_LISTS: &str = "token-lists";
    pub const UNDERLYING: &str = "underlying";
}

/// A source of token logos.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the provider has the credentials and configuration it needs.
    fn is_available(&self) -> bool;

    /// Looks up the logo for a token. The address is lowercased.
    async fn fetch_image(
        &self,
        chain_id: u64,
        address: &str,
    ) -> ProviderResult<Option<ImageArtifact>>;
}

/// Providers assembled from configuration, plus the local provider on its
/// own so the sync pipeline can use its bulk lookup.
pub struct ProviderSet {
    pub chain: Arc<ProviderChain>,
    pub local: Arc<LocalImageProvider>,
}

/// Builds the provider chain in priority order: local first, then remote
/// sources by data quality, with the underlying-asset resolver last.
pub fn build_providers(
    config: &ProvidersConfig,
    local_images_path: impl Into<PathBuf>,
    http: reqwest::Client,
) -> AppResult<ProviderSet> {
    let local = Arc::new(LocalImageProvider::new(local_images_path));
    let protocol_registry = Arc::new(protocol_registry::ProtocolAssetRegistry::new(
        http.clone(),
        &config.protocol_registry,
    ));

    let direct: Vec<Arc<dyn ImageProvider>> = vec![
        local.clone(),
        Arc::new(coingecko::CoinGeckoProvider::new(http.clone(), &config.coingecko)),
        Arc::new(dex_token_list::DexTokenListProvider::new(
            http.clone(),
            &config.dex_token_list,
        )),
        Arc::new(alchemy::AlchemyProvider::new(http.clone(), &config.alchemy)),
        Arc::new(moralis::MoralisProvider::new(http.clone(), &config.moralis)),
        Arc::new(protocol_registry::ProtocolRegistryProvider::new(
            protocol_registry.clone(),
            config.protocol_registry.enabled,
        )),
        Arc::new(token_lists::TokenListsProvider::new(http.clone(), &config.token_lists)),
    ];

    // The underlying resolver delegates to the direct providers only, so it
    // can never reach itself.
    let delegate = Arc::new(ProviderChain::new(direct.clone()));
    let rpc = Arc::new(rpc::RpcClient::new(http, config.rpc_urls.clone()));
    let underlying = underlying::UnderlyingAssetProvider::new(
        config.underlying.enabled,
        protocol_registry,
        rpc,
        parse_exception_addresses(&config.underlying.exception_addresses)?,
        delegate,
    )?;

    let mut all = direct;
    all.push(Arc::new(underlying));

    let chain = ProviderChain::new(all);
    tracing::info!(
        "Provider chain: {} (available: {})",
        chain.provider_names().join(", "),
        chain.available_providers().join(", ")
    );

    Ok(ProviderSet {
        chain: Arc::new(chain),
        local,
    })
}

/// Parses `chainId:address` entries.
fn parse_exception_addresses(entries: &[String]) -> AppResult<HashSet<(u64, String)>> {
    entries
        .iter()
        .map(|entry| {
            let (chain, address) = entry.split_once(':').ok_or_else(|| {
                AppError::configuration(format!(
                    "Invalid underlying exception '{entry}', expected chainId:address"
                ))
            })?;
            let chain_id = chain.trim().parse::<u64>().map_err(|_| {
                AppError::configuration(format!(
                    "Invalid chain id in underlying exception '{entry}'"
                ))
            })?;
            if !is_valid_address(address.trim()) {
                return Err(AppError::configuration(format!(
                    "Invalid address in underlying exception '{entry}'"
                )));
            }
            Ok((chain_id, normalize_address(address)))
        })
        .collect()
}

/// Per-chain lookup shared by providers that map chain ids to upstream names.
pub(crate) fn chain_name(
    map: &std::collections::BTreeMap<String, String>,
    chain_id: u64,
) -> Option<&str> {
    chain_entry(map, chain_id).filter(|name| !name.is_empty())
}

/// Treats blank configured keys as absent.
pub(crate) fn usable_key(key: &Option<String>) -> Option<&str> {
    key.as_deref().map(str::trim).filter(|k| !k.is_empty())
}
