//! Market Data Client - CoinGecko
//!
//! GET /coins/markets?vs_currency=usd&ids={id}. Free tier, no API key
//! required; an optional key raises the rate limit. Prices here are for
//! display only - nothing risk-related is derived from market data.

use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::explorer::build_http_client;
use super::{MarketApi, ProviderId};
use crate::models::errors::ProviderError;
use crate::utils::constants::get_market_coin_id;

// ============================================
// RAW RESPONSE TYPES
// ============================================

/// One /coins/markets entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawMarketData {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub current_price: Option<f64>,
    #[serde(default)]
    pub price_change_percentage_24h: Option<f64>,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub total_volume: Option<f64>,
}

// ============================================
// CLIENT
// ============================================

/// CoinGecko market data client
pub struct CoinGeckoClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(
        base_url: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait::async_trait]
impl MarketApi for CoinGeckoClient {
    async fn get_market_price(&self, symbol: &str) -> Result<RawMarketData, ProviderError> {
        let coin_id = get_market_coin_id(symbol).ok_or_else(|| {
            ProviderError::not_found(
                ProviderId::Market,
                format!("No market mapping for symbol {}", symbol),
            )
        })?;

        let url = format!("{}/coins/markets", self.base_url);
        debug!("Market call: {} ({})", symbol, coin_id);

        let mut request = self
            .client
            .get(&url)
            .query(&[("vs_currency", "usd"), ("ids", coin_id)]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderId::Market, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(ProviderId::Market, status));
        }

        let entries: Vec<RawMarketData> = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(ProviderId::Market, e.to_string()))?;

        entries.into_iter().next().ok_or_else(|| {
            ProviderError::not_found(ProviderId::Market, format!("No market data for {}", coin_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_market_data_deserialization() {
        let json = r#"[{
            "id": "ethereum",
            "symbol": "eth",
            "current_price": 2450.12,
            "price_change_percentage_24h": -1.8,
            "market_cap": 294000000000.0,
            "total_volume": 12500000000.0
        }]"#;

        let entries: Vec<RawMarketData> = serde_json::from_str(json).expect("parse");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].current_price, Some(2450.12));
    }

    #[test]
    fn test_market_data_tolerates_nulls() {
        let json = r#"[{"id": "ethereum", "symbol": "eth", "current_price": null}]"#;
        let entries: Vec<RawMarketData> = serde_json::from_str(json).expect("parse");
        assert_eq!(entries[0].current_price, None);
    }
}
