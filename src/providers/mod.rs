//! Provider Clients
//!
//! One thin client per upstream data source, each behind an async trait so
//! the aggregator (and the test suite) can swap implementations. A client
//! performs exactly one outbound HTTP call per trait-method invocation and
//! never retries internally - the retry budget belongs to the aggregator.

pub mod explorer;
pub mod indexer;
pub mod market;
pub mod registry;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::errors::ProviderError;

pub use explorer::{EtherscanClient, RawBytecode, RawLog, RawReceipt, RawTransaction};
pub use indexer::{
    MoralisClient, RawApproval, RawApprovalSpender, RawApprovalToken, RawNativeBalance,
    RawTokenBalance,
};
pub use market::{CoinGeckoClient, RawMarketData};
pub use registry::{RawVerification, SourcifyClient};

/// Identity of an upstream data source. Doubles as the authority label in
/// the aggregator's conflict-resolution rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// Chain explorer (transactions, bytecode) - Etherscan
    Explorer,
    /// Balance/token indexer - Moralis
    Indexer,
    /// Contract verification registry - Sourcify
    Registry,
    /// Market data feed - CoinGecko
    Market,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explorer => "etherscan",
            Self::Indexer => "moralis",
            Self::Registry => "sourcify",
            Self::Market => "coingecko",
        }
    }
}

/// Chain explorer boundary: transactions and account bytecode
#[async_trait]
pub trait ExplorerApi: Send + Sync {
    async fn get_transaction(&self, hash: B256, chain_id: u64)
        -> Result<RawTransaction, ProviderError>;

    async fn get_transaction_receipt(
        &self,
        hash: B256,
        chain_id: u64,
    ) -> Result<RawReceipt, ProviderError>;

    async fn get_code(&self, address: Address, chain_id: u64)
        -> Result<RawBytecode, ProviderError>;
}

/// Balance/token indexer boundary
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn get_native_balance(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<RawNativeBalance, ProviderError>;

    async fn get_token_holdings(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Vec<RawTokenBalance>, ProviderError>;

    async fn get_token_approvals(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Vec<RawApproval>, ProviderError>;
}

/// Contract verification registry boundary
#[async_trait]
pub trait RegistryApi: Send + Sync {
    async fn get_verification(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<RawVerification, ProviderError>;
}

/// Market data boundary (standalone operation, not part of the fan-out)
#[async_trait]
pub trait MarketApi: Send + Sync {
    async fn get_market_price(&self, symbol: &str) -> Result<RawMarketData, ProviderError>;
}

/// The full set of wired provider clients, shared across sessions
#[derive(Clone)]
pub struct ProviderSet {
    pub explorer: Arc<dyn ExplorerApi>,
    pub indexer: Arc<dyn IndexerApi>,
    pub registry: Arc<dyn RegistryApi>,
    pub market: Arc<dyn MarketApi>,
}
