use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::parse_default;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Cache lifetime advertised for stored images
    #[serde(default = "default_image_cache_max_age", with = "duration_serde::duration")]
    pub image_cache_max_age: Duration,
    /// Cache lifetime advertised when the bundled default image is served
    #[serde(default = "default_fallback_cache_max_age", with = "duration_serde::duration")]
    pub fallback_cache_max_age: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Object store holding synced images
    #[serde(default = "default_object_store_path")]
    pub object_store_path: String,
    /// Pre-existing `{chainId}/{address}/image.{ext}` tree used for migration
    #[serde(default = "default_local_images_path")]
    pub local_images_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_registry_timeout", with = "duration_serde::duration")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Minimum interval between two syncs of the same chain
    #[serde(default = "default_sync_cooldown", with = "duration_serde::duration")]
    pub cooldown: Duration,
    #[serde(default = "default_migration_batch_size")]
    pub migration_batch_size: usize,
    #[serde(default = "default_migration_batch_pause", with = "duration_serde::duration")]
    pub migration_batch_pause: Duration,
    /// Spacing between the starts of two provider resolutions
    #[serde(default = "default_download_delay", with = "duration_serde::duration")]
    pub download_delay: Duration,
    #[serde(default = "default_download_concurrency")]
    pub download_concurrency: usize,
    #[serde(default = "default_download_timeout", with = "duration_serde::duration")]
    pub download_timeout: Duration,
    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// JSON-RPC endpoints keyed by chain id
    #[serde(default = "default_rpc_urls")]
    pub rpc_urls: BTreeMap<String, String>,
    #[serde(default)]
    pub coingecko: CoinGeckoConfig,
    #[serde(default)]
    pub dex_token_list: DexTokenListConfig,
    #[serde(default)]
    pub alchemy: AlchemyConfig,
    #[serde(default)]
    pub moralis: MoralisConfig,
    #[serde(default)]
    pub protocol_registry: ProtocolRegistryConfig,
    #[serde(default)]
    pub token_lists: TokenListsConfig,
    #[serde(default)]
    pub underlying: UnderlyingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoinGeckoConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
    /// Chain id to CoinGecko asset platform id
    pub platforms: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DexTokenListConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Chains where this source is known to serve bad logos
    pub excluded_chains: Vec<u64>,
    #[serde(with = "duration_serde::duration")]
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlchemyConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    /// Endpoint template; `{network}` is replaced with the mapped network name
    pub url_template: String,
    pub networks: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MoralisConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolRegistryConfig {
    pub enabled: bool,
    pub base_url: String,
    pub supported_chains: Vec<u64>,
    #[serde(with = "duration_serde::duration")]
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenListsConfig {
    pub enabled: bool,
    pub urls: Vec<String>,
    #[serde(with = "duration_serde::duration")]
    pub cache_ttl: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnderlyingConfig {
    pub enabled: bool,
    /// Principal tokens not flagged by the protocol registry, as `chainId:address`
    pub exception_addresses: Vec<String>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_image_cache_max_age() -> Duration {
    parse_default(DEFAULT_IMAGE_CACHE_MAX_AGE)
}

fn default_fallback_cache_max_age() -> Duration {
    parse_default(DEFAULT_FALLBACK_CACHE_MAX_AGE)
}

fn default_object_store_path() -> String {
    DEFAULT_OBJECT_STORE_PATH.to_string()
}

fn default_local_images_path() -> String {
    DEFAULT_LOCAL_IMAGES_PATH.to_string()
}

fn default_registry_url() -> String {
    DEFAULT_REGISTRY_URL.to_string()
}

fn default_registry_timeout() -> Duration {
    parse_default(DEFAULT_REGISTRY_TIMEOUT)
}

fn default_sync_cooldown() -> Duration {
    parse_default(DEFAULT_SYNC_COOLDOWN)
}

fn default_migration_batch_size() -> usize {
    DEFAULT_MIGRATION_BATCH_SIZE
}

fn default_migration_batch_pause() -> Duration {
    parse_default(DEFAULT_MIGRATION_BATCH_PAUSE)
}

fn default_download_delay() -> Duration {
    parse_default(DEFAULT_DOWNLOAD_DELAY)
}

fn default_download_concurrency() -> usize {
    DEFAULT_DOWNLOAD_CONCURRENCY
}

fn default_download_timeout() -> Duration {
    parse_default(DEFAULT_DOWNLOAD_TIMEOUT)
}

fn default_max_image_bytes() -> usize {
    DEFAULT_MAX_IMAGE_BYTES
}

fn default_rpc_urls() -> BTreeMap<String, String> {
    chain_map(DEFAULT_RPC_URLS)
}

fn default_provider_cache_ttl() -> Duration {
    parse_default(DEFAULT_PROVIDER_CACHE_TTL)
}

fn chain_map(entries: &[(u64, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(chain_id, value)| (chain_id.to_string(), (*value).to_string()))
        .collect()
}

/// Looks up a per-chain entry in a map keyed by the decimal chain id.
pub fn chain_entry(map: &BTreeMap<String, String>, chain_id: u64) -> Option<&str> {
    map.get(&chain_id.to_string()).map(String::as_str)
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            image_cache_max_age: default_image_cache_max_age(),
            fallback_cache_max_age: default_fallback_cache_max_age(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            object_store_path: default_object_store_path(),
            local_images_path: default_local_images_path(),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout: default_registry_timeout(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cooldown: default_sync_cooldown(),
            migration_batch_size: default_migration_batch_size(),
            migration_batch_pause: default_migration_batch_pause(),
            download_delay: default_download_delay(),
            download_concurrency: default_download_concurrency(),
            download_timeout: default_download_timeout(),
            max_image_bytes: default_max_image_bytes(),
        }
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            rpc_urls: default_rpc_urls(),
            coingecko: CoinGeckoConfig::default(),
            dex_token_list: DexTokenListConfig::default(),
            alchemy: AlchemyConfig::default(),
            moralis: MoralisConfig::default(),
            protocol_registry: ProtocolRegistryConfig::default(),
            token_lists: TokenListsConfig::default(),
            underlying: UnderlyingConfig::default(),
        }
    }
}

impl Default for CoinGeckoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: DEFAULT_COINGECKO_URL.to_string(),
            platforms: chain_map(DEFAULT_COINGECKO_PLATFORMS),
        }
    }
}

impl Default for DexTokenListConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_DEX_TOKEN_LIST_URL.to_string(),
            excluded_chains: DEFAULT_DEX_EXCLUDED_CHAINS.to_vec(),
            cache_ttl: default_provider_cache_ttl(),
        }
    }
}

impl Default for AlchemyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            url_template: DEFAULT_ALCHEMY_URL_TEMPLATE.to_string(),
            networks: chain_map(DEFAULT_ALCHEMY_NETWORKS),
        }
    }
}

impl Default for MoralisConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            base_url: DEFAULT_MORALIS_URL.to_string(),
        }
    }
}

impl Default for ProtocolRegistryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_PROTOCOL_REGISTRY_URL.to_string(),
            supported_chains: DEFAULT_PROTOCOL_REGISTRY_CHAINS.to_vec(),
            cache_ttl: default_provider_cache_ttl(),
        }
    }
}

impl Default for TokenListsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            urls: DEFAULT_TOKEN_LIST_URLS
                .iter()
                .map(|url| (*url).to_string())
                .collect(),
            cache_ttl: default_provider_cache_ttl(),
        }
    }
}

impl Default for UnderlyingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            exception_addresses: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from a TOML file, writing the defaults to that path
    /// first if it does not exist.
    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)
                .with_context(|| format!("Failed to read config file {config_file}"))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {config_file}"))
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }

    /// Applies secrets and endpoints from the environment on top of the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(ENV_COINGECKO_API_KEY) {
            self.providers.coingecko.api_key = Some(key);
        }
        if let Some(key) = non_empty(ENV_ALCHEMY_API_KEY) {
            self.providers.alchemy.api_key = Some(key);
        }
        if let Some(key) = non_empty(ENV_MORALIS_API_KEY) {
            self.providers.moralis.api_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_REGISTRY_URL) {
            self.registry.base_url = url;
        }
    }
}
