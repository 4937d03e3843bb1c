/// Configuration default values
///
/// All default values for configuration options live here so they can be
/// changed in one place.
// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_IMAGE_CACHE_MAX_AGE: &str = "24h";
pub const DEFAULT_FALLBACK_CACHE_MAX_AGE: &str = "5m";

// Storage defaults
pub const DEFAULT_OBJECT_STORE_PATH: &str = "./data/images";
pub const DEFAULT_LOCAL_IMAGES_PATH: &str = "./data/local";

// Token registry defaults
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:3000";
pub const DEFAULT_REGISTRY_TIMEOUT: &str = "30s";

// Sync defaults
pub const DEFAULT_SYNC_COOLDOWN: &str = "1m";
pub const DEFAULT_MIGRATION_BATCH_SIZE: usize = 20;
pub const DEFAULT_MIGRATION_BATCH_PAUSE: &str = "100ms";
pub const DEFAULT_DOWNLOAD_DELAY: &str = "250ms";
pub const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 4;
pub const DEFAULT_DOWNLOAD_TIMEOUT: &str = "15s";
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

// Provider defaults
pub const DEFAULT_PROVIDER_CACHE_TTL: &str = "5m";
pub const DEFAULT_COINGECKO_URL: &str = "https://pro-api.coingecko.com/api/v3";
pub const DEFAULT_DEX_TOKEN_LIST_URL: &str = "https://tokens.1inch.io/v1.2";
pub const DEFAULT_DEX_EXCLUDED_CHAINS: &[u64] = &[324, 1101];
pub const DEFAULT_ALCHEMY_URL_TEMPLATE: &str = "https://{network}.g.alchemy.com/v2";
pub const DEFAULT_MORALIS_URL: &str = "https://deep-index.moralis.io/api/v2.2";
pub const DEFAULT_PROTOCOL_REGISTRY_URL: &str = "https://api-v2.pendle.finance/core";
pub const DEFAULT_PROTOCOL_REGISTRY_CHAINS: &[u64] = &[1, 10, 56, 146, 5000, 8453, 42161, 80094];

pub const DEFAULT_COINGECKO_PLATFORMS: &[(u64, &str)] = &[
    (1, "ethereum"),
    (10, "optimistic-ethereum"),
    (56, "binance-smart-chain"),
    (100, "xdai"),
    (137, "polygon-pos"),
    (146, "sonic"),
    (250, "fantom"),
    (324, "zksync"),
    (8453, "base"),
    (42161, "arbitrum-one"),
    (43114, "avalanche"),
    (59144, "linea"),
    (534352, "scroll"),
];

pub const DEFAULT_ALCHEMY_NETWORKS: &[(u64, &str)] = &[
    (1, "eth-mainnet"),
    (10, "opt-mainnet"),
    (56, "bnb-mainnet"),
    (100, "gnosis-mainnet"),
    (137, "polygon-mainnet"),
    (324, "zksync-mainnet"),
    (8453, "base-mainnet"),
    (42161, "arb-mainnet"),
    (43114, "avax-mainnet"),
    (59144, "linea-mainnet"),
    (534352, "scroll-mainnet"),
];

pub const DEFAULT_RPC_URLS: &[(u64, &str)] = &[
    (1, "https://eth.llamarpc.com"),
    (10, "https://mainnet.optimism.io"),
    (56, "https://bsc-dataseed.binance.org"),
    (8453, "https://mainnet.base.org"),
    (42161, "https://arb1.arbitrum.io/rpc"),
];

pub const DEFAULT_TOKEN_LIST_URLS: &[&str] = &[
    "https://tokens.uniswap.org",
    "https://tokens.coingecko.com/uniswap/all.json",
    "https://static.optimism.io/optimism.tokenlist.json",
    "https://bridge.arbitrum.io/token-list-42161.json",
    "https://raw.githubusercontent.com/compound-finance/token-list/master/compound.tokenlist.json",
    "https://www.gemini.com/uniswap/manifest.json",
    "https://tokens.pancakeswap.finance/pancakeswap-extended.json",
    "https://unpkg.com/quickswap-default-token-list@latest/build/quickswap-default.tokenlist.json",
    "https://raw.githubusercontent.com/SmolDapp/tokenLists/main/lists/tokenlistooor.json",
];

// Environment overrides
pub const ENV_COINGECKO_API_KEY: &str = "TOKEN_LOGO_COINGECKO_API_KEY";
pub const ENV_ALCHEMY_API_KEY: &str = "TOKEN_LOGO_ALCHEMY_API_KEY";
pub const ENV_MORALIS_API_KEY: &str = "TOKEN_LOGO_MORALIS_API_KEY";
pub const ENV_REGISTRY_URL: &str = "TOKEN_LOGO_REGISTRY_URL";
