//! Constants Module - Single Source of Truth
//!
//! All chain identifiers, provider endpoints, and shared configuration
//! defaults live here. No hardcoded values in other modules.

// ============================================
// APPLICATION CONSTANTS
// ============================================

/// Application name
pub const APP_NAME: &str = "Walletscope";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent for outbound provider requests
pub const USER_AGENT: &str = "Walletscope/0.1.0";

// ============================================
// TIMEOUTS & CACHE DEFAULTS
// ============================================

/// Default per-provider call timeout (seconds)
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 8;

/// Default outer deadline for a full aggregation (seconds)
pub const DEFAULT_RESOLUTION_DEADLINE_SECS: u64 = 15;

/// Cache TTL for balance/price-bearing results (seconds)
pub const DEFAULT_BALANCE_TTL_SECS: u64 = 30;

/// Cache TTL for immutable facts (mined transactions)
pub const DEFAULT_TRANSACTION_TTL_SECS: u64 = 3600;

/// Cache TTL for partial results (short, so a retry comes quickly)
pub const DEFAULT_PARTIAL_TTL_SECS: u64 = 5;

/// Retry backoff base (milliseconds)
pub const RETRY_BASE_DELAY_MS: u64 = 250;

/// Maximum retries per provider call (retryable errors only)
pub const MAX_PROVIDER_RETRIES: u32 = 2;

/// Jitter applied to retry delays (percent of the capped delay)
pub const RETRY_JITTER_PERCENT: u64 = 20;

// ============================================
// CHAIN IDS - Single Source of Truth
// ============================================

/// Ethereum Mainnet
pub const CHAIN_ID_ETHEREUM: u64 = 1;
/// BNB Smart Chain
pub const CHAIN_ID_BSC: u64 = 56;
/// Polygon
pub const CHAIN_ID_POLYGON: u64 = 137;
/// Arbitrum One
pub const CHAIN_ID_ARBITRUM: u64 = 42161;
/// Optimism
pub const CHAIN_ID_OPTIMISM: u64 = 10;
/// Avalanche C-Chain
pub const CHAIN_ID_AVALANCHE: u64 = 43114;
/// Base
pub const CHAIN_ID_BASE: u64 = 8453;

/// All supported EVM chain IDs
pub const SUPPORTED_CHAIN_IDS: [u64; 7] = [
    CHAIN_ID_ETHEREUM,
    CHAIN_ID_BSC,
    CHAIN_ID_POLYGON,
    CHAIN_ID_ARBITRUM,
    CHAIN_ID_OPTIMISM,
    CHAIN_ID_AVALANCHE,
    CHAIN_ID_BASE,
];

/// Check whether a chain id is supported
pub fn is_supported_chain(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS.contains(&chain_id)
}

/// Get human-readable chain name
pub fn get_chain_name(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM => "Ethereum",
        CHAIN_ID_BSC => "BNB Smart Chain",
        CHAIN_ID_POLYGON => "Polygon",
        CHAIN_ID_ARBITRUM => "Arbitrum One",
        CHAIN_ID_OPTIMISM => "Optimism",
        CHAIN_ID_AVALANCHE => "Avalanche",
        CHAIN_ID_BASE => "Base",
        _ => "Unknown",
    }
}

/// Get native token symbol for a chain
pub fn get_native_symbol(chain_id: u64) -> &'static str {
    match chain_id {
        CHAIN_ID_ETHEREUM | CHAIN_ID_ARBITRUM | CHAIN_ID_OPTIMISM | CHAIN_ID_BASE => "ETH",
        CHAIN_ID_BSC => "BNB",
        CHAIN_ID_POLYGON => "POL",
        CHAIN_ID_AVALANCHE => "AVAX",
        _ => "ETH",
    }
}

/// Native token decimals are 18 on every supported chain. This is a chain
/// property, not a token default - ERC-20 decimals are never assumed.
pub const NATIVE_DECIMALS: u8 = 18;

// ============================================
// PROVIDER ENDPOINTS
// ============================================

/// Etherscan v2 unified endpoint (chain selected via `chainid` param)
pub const DEFAULT_EXPLORER_BASE_URL: &str = "https://api.etherscan.io/v2/api";

/// Moralis deep-index REST endpoint
pub const DEFAULT_INDEXER_BASE_URL: &str = "https://deep-index.moralis.io/api/v2.2";

/// Sourcify verification registry endpoint
pub const DEFAULT_REGISTRY_BASE_URL: &str = "https://sourcify.dev/server";

/// CoinGecko market data endpoint
pub const DEFAULT_MARKET_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Moralis chain slug for a numeric chain id
pub fn get_indexer_chain_slug(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        CHAIN_ID_ETHEREUM => Some("eth"),
        CHAIN_ID_BSC => Some("bsc"),
        CHAIN_ID_POLYGON => Some("polygon"),
        CHAIN_ID_ARBITRUM => Some("arbitrum"),
        CHAIN_ID_OPTIMISM => Some("optimism"),
        CHAIN_ID_AVALANCHE => Some("avalanche"),
        CHAIN_ID_BASE => Some("base"),
        _ => None,
    }
}

/// CoinGecko coin id for a ticker symbol
pub fn get_market_coin_id(symbol: &str) -> Option<&'static str> {
    match symbol.to_uppercase().as_str() {
        "ETH" | "WETH" => Some("ethereum"),
        "BNB" | "WBNB" => Some("binancecoin"),
        "POL" | "MATIC" => Some("polygon-ecosystem-token"),
        "AVAX" => Some("avalanche-2"),
        "BTC" | "WBTC" => Some("bitcoin"),
        "USDT" => Some("tether"),
        "USDC" => Some("usd-coin"),
        "DAI" => Some("dai"),
        "UNI" => Some("uniswap"),
        "LINK" => Some("chainlink"),
        _ => None,
    }
}

// ============================================
// BYTECODE MARKERS
// ============================================

/// EIP-7702 delegation designator prefix. An EOA whose code starts with
/// this is delegated to another account, not a deployed contract.
pub const DELEGATION_DESIGNATOR_PREFIX: &str = "0xef0100";
