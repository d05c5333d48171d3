//! Balance/Token Indexer Client - Moralis
//!
//! REST endpoints on deep-index.moralis.io:
//! - GET /{address}/balance              - native balance
//! - GET /wallets/{address}/tokens      - ERC-20 holdings with spam flags
//! - GET /wallets/{address}/approvals   - outstanding ERC-20 allowances
//!
//! The indexer is the authoritative source for raw balance amounts. Fields
//! like `possible_spam` and `verified_contract` feed the classifier's spam
//! filter; `decimals` may legitimately be absent and is passed through as
//! None (never defaulted).

use alloy_primitives::Address;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::explorer::build_http_client;
use super::{IndexerApi, ProviderId};
use crate::models::errors::ProviderError;
use crate::utils::constants::get_indexer_chain_slug;

// ============================================
// RAW RESPONSE TYPES
// ============================================

/// Native balance response
#[derive(Debug, Clone, Deserialize)]
pub struct RawNativeBalance {
    /// Wei as a decimal string
    pub balance: String,
    /// USD value if the indexer priced it
    #[serde(default)]
    pub usd_value: Option<f64>,
}

/// One token balance entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawTokenBalance {
    pub token_address: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// May be absent for non-standard tokens - stays unknown downstream
    #[serde(default)]
    pub decimals: Option<u8>,
    /// Raw amount as a decimal string
    pub balance: String,
    #[serde(default)]
    pub possible_spam: Option<bool>,
    #[serde(default)]
    pub verified_contract: Option<bool>,
    #[serde(default)]
    pub usd_price: Option<f64>,
    #[serde(default)]
    pub usd_value: Option<f64>,
}

/// One outstanding approval entry
#[derive(Debug, Clone, Deserialize)]
pub struct RawApproval {
    pub token: RawApprovalToken,
    pub spender: RawApprovalSpender,
    /// Allowance as a decimal string; "unlimited" allowances arrive as
    /// type(uint256).max or close to it
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawApprovalToken {
    pub address: String,
    #[serde(default)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawApprovalSpender {
    pub address: String,
}

#[derive(Debug, Deserialize)]
struct PagedResponse<T> {
    #[serde(default = "Vec::new")]
    result: Vec<T>,
}

// ============================================
// CLIENT
// ============================================

/// Moralis deep-index client
pub struct MoralisClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl MoralisClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    fn chain_slug(chain_id: u64) -> Result<&'static str, ProviderError> {
        get_indexer_chain_slug(chain_id).ok_or_else(|| {
            ProviderError::not_found(
                ProviderId::Indexer,
                format!("No indexer mapping for chain {}", chain_id),
            )
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        chain_slug: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Indexer call: {} (chain {})", path, chain_slug);

        let response = self
            .client
            .get(&url)
            .query(&[("chain", chain_slug)])
            .header("X-API-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderId::Indexer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(ProviderId::Indexer, status));
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(ProviderId::Indexer, e.to_string()))
    }
}

#[async_trait::async_trait]
impl IndexerApi for MoralisClient {
    async fn get_native_balance(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<RawNativeBalance, ProviderError> {
        let slug = Self::chain_slug(chain_id)?;
        self.get_json(&format!("/{:#x}/balance", address), slug).await
    }

    async fn get_token_holdings(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Vec<RawTokenBalance>, ProviderError> {
        let slug = Self::chain_slug(chain_id)?;
        let page: PagedResponse<RawTokenBalance> = self
            .get_json(&format!("/wallets/{:#x}/tokens", address), slug)
            .await?;
        Ok(page.result)
    }

    async fn get_token_approvals(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<Vec<RawApproval>, ProviderError> {
        let slug = Self::chain_slug(chain_id)?;
        let page: PagedResponse<RawApproval> = self
            .get_json(&format!("/wallets/{:#x}/approvals", address), slug)
            .await?;
        Ok(page.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_balance_deserialization() {
        let json = r#"{
            "token_address": "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "symbol": "USDT",
            "name": "Tether USD",
            "decimals": 6,
            "balance": "1500000",
            "possible_spam": false,
            "verified_contract": true,
            "usd_price": 1.0,
            "usd_value": 1.5
        }"#;

        let balance: RawTokenBalance = serde_json::from_str(json).expect("parse");
        assert_eq!(balance.decimals, Some(6));
        assert_eq!(balance.possible_spam, Some(false));
    }

    #[test]
    fn test_token_balance_missing_decimals_stays_none() {
        let json = r#"{
            "token_address": "0x0000000000000000000000000000000000000001",
            "balance": "99"
        }"#;

        let balance: RawTokenBalance = serde_json::from_str(json).expect("parse");
        assert_eq!(balance.decimals, None);
        assert_eq!(balance.symbol, None);
    }

    #[test]
    fn test_approval_deserialization() {
        let json = r#"{
            "token": {"address": "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", "symbol": "USDC"},
            "spender": {"address": "0x68b3465833fb72a70ecdf485e0e4c7bd8665fc45"},
            "value": "115792089237316195423570985008687907853269984665640564039457584007913129639935"
        }"#;

        let approval: RawApproval = serde_json::from_str(json).expect("parse");
        assert_eq!(approval.token.symbol.as_deref(), Some("USDC"));
    }

    #[test]
    fn test_unsupported_chain_slug() {
        let err = MoralisClient::chain_slug(424242).expect_err("no slug");
        assert_eq!(err.kind, crate::models::errors::ProviderErrorKind::NotFound);
    }
}
