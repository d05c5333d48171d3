//! Analysis session - the engine callers talk to
//!
//! Wraps the aggregator with the lifecycle concerns one resolution should
//! not know about:
//! - input validation before any dispatch
//! - TTL result cache keyed by the normalized query key
//! - in-flight de-duplication: concurrent queries for the same key join
//!   one resolution instead of fanning out twice
//! - cancellation safety: resolution runs on a detached task, so a caller
//!   that goes away (dropped HTTP connection) still leaves a warm cache
//!
//! Partial results are cached on a short TTL so a recovered provider gets
//! re-queried quickly; complete results live by query kind.

use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::aggregator::{call_with_retry, Aggregator};
use crate::classifier::classify;
use crate::config::EngineConfig;
use crate::models::errors::{ProviderError, QueryValidationError};
use crate::models::query::{AnalysisQuery, QueryKey, QueryKind};
use crate::models::types::{AnalysisResult, MarketSnapshot};
use crate::providers::{
    CoinGeckoClient, EtherscanClient, MoralisClient, ProviderId, ProviderSet, SourcifyClient,
};
use crate::utils::cache::{CacheStats, ResultCache};
use crate::utils::constants::get_market_coin_id;

type SharedResolution = Shared<BoxFuture<'static, AnalysisResult>>;

/// Engine-level error for operations that can fail terminally
/// (the fan-out operations never do; market lookup can)
#[derive(Debug)]
pub enum EngineError {
    Validation(QueryValidationError),
    Provider(ProviderError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{}", err),
            Self::Provider(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<QueryValidationError> for EngineError {
    fn from(err: QueryValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<ProviderError> for EngineError {
    fn from(err: ProviderError) -> Self {
        Self::Provider(err)
    }
}

/// Multi-source analysis engine. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct AnalysisEngine {
    aggregator: Aggregator,
    providers: ProviderSet,
    cache: ResultCache,
    in_flight: Arc<DashMap<QueryKey, SharedResolution>>,
    balance_ttl: Duration,
    transaction_ttl: Duration,
    partial_ttl: Duration,
    call_timeout: Duration,
}

impl AnalysisEngine {
    /// Wire up the real provider clients from config
    pub fn new(config: &EngineConfig) -> Result<Self, ProviderError> {
        let providers = ProviderSet {
            explorer: Arc::new(EtherscanClient::new(
                config.explorer_base_url.clone(),
                config.explorer_api_key.clone(),
                config.provider_timeout,
            )?),
            indexer: Arc::new(MoralisClient::new(
                config.indexer_base_url.clone(),
                config.indexer_api_key.clone(),
                config.provider_timeout,
            )?),
            registry: Arc::new(SourcifyClient::new(
                config.registry_base_url.clone(),
                config.provider_timeout,
            )?),
            market: Arc::new(CoinGeckoClient::new(
                config.market_base_url.clone(),
                config.market_api_key.clone(),
                config.provider_timeout,
            )?),
        };
        Ok(Self::with_providers(providers, config))
    }

    /// Wire up with caller-supplied providers (tests inject mocks here)
    pub fn with_providers(providers: ProviderSet, config: &EngineConfig) -> Self {
        Self {
            aggregator: Aggregator::new(providers.clone(), config),
            providers,
            cache: ResultCache::new(),
            in_flight: Arc::new(DashMap::new()),
            balance_ttl: config.balance_ttl,
            transaction_ttl: config.transaction_ttl,
            partial_ttl: config.partial_ttl,
            call_timeout: config.provider_timeout,
        }
    }

    // ============================================
    // ANALYSIS OPERATIONS
    // ============================================

    /// Full wallet-style analysis: balances, holdings, approvals, risk
    pub async fn analyze_address(
        &self,
        value: &str,
        chain_id: u64,
    ) -> Result<AnalysisResult, QueryValidationError> {
        let query = AnalysisQuery::address(value, chain_id)?;
        Ok(self.resolve(query).await)
    }

    /// Transaction lookup: envelope, receipt status, decoded transfers
    pub async fn analyze_transaction(
        &self,
        value: &str,
        chain_id: u64,
    ) -> Result<AnalysisResult, QueryValidationError> {
        let query = AnalysisQuery::transaction(value, chain_id)?;
        Ok(self.resolve(query).await)
    }

    /// Contract lookup: bytecode classification + verification status
    pub async fn analyze_contract(
        &self,
        value: &str,
        chain_id: u64,
    ) -> Result<AnalysisResult, QueryValidationError> {
        let query = AnalysisQuery::contract(value, chain_id)?;
        Ok(self.resolve(query).await)
    }

    /// Drop any cached result for the query and resolve fresh
    pub async fn refresh(&self, query: AnalysisQuery) -> AnalysisResult {
        let key = query.key();
        self.cache.invalidate(&key);
        info!("refresh requested: {}", key);
        self.resolve(query).await
    }

    /// Spot market data for one symbol. Standalone: never part of the
    /// address/transaction/contract fan-out and never cached.
    pub async fn market_price(&self, symbol: &str) -> Result<MarketSnapshot, EngineError> {
        let normalized = symbol.trim().to_lowercase();
        if get_market_coin_id(&normalized).is_none() {
            return Err(QueryValidationError::invalid_symbol(symbol).into());
        }

        let market = self.providers.market.clone();
        let raw = call_with_retry(ProviderId::Market, self.call_timeout, || {
            market.get_market_price(&normalized)
        })
        .await?;

        let price_usd = raw.current_price.ok_or_else(|| {
            ProviderError::malformed(ProviderId::Market, "Market entry carries no price")
        })?;

        Ok(MarketSnapshot {
            symbol: raw.symbol.to_uppercase(),
            price_usd,
            change_24h_percent: raw.price_change_percentage_24h,
            market_cap_usd: raw.market_cap,
            volume_24h_usd: raw.total_volume,
            as_of: chrono::Utc::now(),
        })
    }

    /// Cache counters for the stats endpoint
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Resolutions currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Sweep expired cache entries; returns how many were removed
    pub fn sweep_cache(&self) -> usize {
        self.cache.cleanup_expired()
    }

    // ============================================
    // RESOLUTION PIPELINE
    // ============================================

    async fn resolve(&self, query: AnalysisQuery) -> AnalysisResult {
        let key = query.key();
        if let Some(hit) = self.cache.get(&key) {
            return hit;
        }
        self.join_or_start(key, query).await
    }

    /// Join the in-flight resolution for this key, or start one. The entry
    /// API makes the check-and-insert atomic: two concurrent callers end
    /// up awaiting the same shared future, never two fan-outs.
    ///
    /// Insertion happens before the driver task is spawned, so the task's
    /// own cleanup can never race ahead of the insert and strand a
    /// completed future in the map.
    fn join_or_start(&self, key: QueryKey, query: AnalysisQuery) -> SharedResolution {
        match self.in_flight.entry(key.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let shared = self.make_resolution(key, query);
                entry.insert(shared.clone());
                // Detached driver: if every caller drops, the resolution
                // still finishes and leaves a warm cache behind
                tokio::spawn(shared.clone());
                shared
            }
        }
    }

    fn make_resolution(&self, key: QueryKey, query: AnalysisQuery) -> SharedResolution {
        let aggregator = self.aggregator.clone();
        let cache = self.cache.clone();
        let in_flight = self.in_flight.clone();
        let ttl_for = TtlPolicy {
            balance: self.balance_ttl,
            transaction: self.transaction_ttl,
            partial: self.partial_ttl,
        };

        async move {
            let mut result = aggregator.resolve(&query).await;
            classify(&mut result);

            let ttl = ttl_for.ttl(&query, result.partial);
            cache.set(key.clone(), result.clone(), ttl);
            in_flight.remove(&key);
            result
        }
        .boxed()
        .shared()
    }
}

/// Which TTL a finished resolution gets
#[derive(Clone, Copy)]
struct TtlPolicy {
    balance: Duration,
    transaction: Duration,
    partial: Duration,
}

impl TtlPolicy {
    fn ttl(&self, query: &AnalysisQuery, partial: bool) -> Duration {
        if partial {
            // short TTL: give recovered providers a quick second chance
            self.partial
        } else if query.kind() == QueryKind::Transaction {
            // mined transactions are immutable facts
            self.transaction
        } else {
            self.balance
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_policy() {
        let policy = TtlPolicy {
            balance: Duration::from_secs(30),
            transaction: Duration::from_secs(3600),
            partial: Duration::from_secs(5),
        };
        let address = AnalysisQuery::address("0xdAC17F958D2ee523a2206206994597C13D831ec7", 1)
            .expect("valid");
        let tx = AnalysisQuery::transaction(
            "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
            1,
        )
        .expect("valid");

        assert_eq!(policy.ttl(&address, false), Duration::from_secs(30));
        assert_eq!(policy.ttl(&tx, false), Duration::from_secs(3600));
        assert_eq!(policy.ttl(&tx, true), Duration::from_secs(5));
    }
}
