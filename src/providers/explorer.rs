//! Chain Explorer Client - Etherscan v2
//!
//! Uses the unified v2 endpoint (one host, `chainid` query param) with the
//! JSON-RPC proxy module:
//! - proxy/eth_getTransactionByHash - transaction envelope
//! - proxy/eth_getTransactionReceipt - status, gas used, transfer logs
//! - proxy/eth_getCode - bytecode (drives wallet/contract classification)
//!
//! Responses are raw provider shapes; the normalizer owns the mapping to
//! canonical entities. One HTTP call per method, no internal retries.

use alloy_primitives::{Address, B256};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING, USER_AGENT};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{ExplorerApi, ProviderId};
use crate::models::errors::ProviderError;
use crate::utils::constants::USER_AGENT as USER_AGENT_CONST;

// ============================================
// RAW RESPONSE TYPES
// ============================================

/// Transaction envelope as returned by eth_getTransactionByHash.
/// All quantities are 0x-hex strings; the normalizer parses them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawTransaction {
    pub hash: String,
    pub block_number: Option<String>,
    pub from: String,
    pub to: Option<String>,
    pub value: Option<String>,
    pub gas_price: Option<String>,
    pub input: Option<String>,
}

/// Receipt as returned by eth_getTransactionReceipt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    /// "0x1" success, "0x0" failed
    pub status: Option<String>,
    pub gas_used: Option<String>,
    #[serde(default)]
    pub logs: Vec<RawLog>,
}

/// One event log inside a receipt
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: Option<String>,
    pub log_index: Option<String>,
}

/// Bytecode at an address, plus when we saw it
#[derive(Debug, Clone)]
pub struct RawBytecode {
    pub address: Address,
    /// 0x-hex string; "0x" means no code
    pub code: String,
}

/// Etherscan proxy-module envelope: JSON-RPC result or error
#[derive(Debug, Deserialize)]
struct ProxyEnvelope<T> {
    result: Option<T>,
    error: Option<ProxyError>,
}

#[derive(Debug, Deserialize)]
struct ProxyError {
    code: i64,
    message: String,
}

// ============================================
// CLIENT
// ============================================

/// Etherscan v2 explorer client
pub struct EtherscanClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl EtherscanClient {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = build_http_client(timeout)?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Base URL with the API key masked, for logging
    pub fn masked_url(&self) -> String {
        format!("{}?apikey=***HIDDEN***", self.base_url)
    }

    async fn proxy_call<T: for<'de> Deserialize<'de>>(
        &self,
        chain_id: u64,
        action: &str,
        extra: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        let mut params = vec![
            ("chainid", chain_id.to_string()),
            ("module", "proxy".to_string()),
            ("action", action.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        params.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        debug!("Explorer call: {} (chain {})", action, chain_id);

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderId::Explorer, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::from_status(ProviderId::Explorer, status));
        }

        let envelope: ProxyEnvelope<T> = response
            .json()
            .await
            .map_err(|e| ProviderError::malformed(ProviderId::Explorer, e.to_string()))?;

        if let Some(err) = envelope.error {
            return Err(ProviderError::malformed(
                ProviderId::Explorer,
                format!("RPC error {}: {}", err.code, err.message),
            ));
        }

        envelope.result.ok_or_else(|| {
            ProviderError::not_found(ProviderId::Explorer, format!("{}: no result", action))
        })
    }
}

#[async_trait::async_trait]
impl ExplorerApi for EtherscanClient {
    async fn get_transaction(
        &self,
        hash: B256,
        chain_id: u64,
    ) -> Result<RawTransaction, ProviderError> {
        self.proxy_call(
            chain_id,
            "eth_getTransactionByHash",
            &[("txhash", format!("{:#x}", hash))],
        )
        .await
    }

    async fn get_transaction_receipt(
        &self,
        hash: B256,
        chain_id: u64,
    ) -> Result<RawReceipt, ProviderError> {
        self.proxy_call(
            chain_id,
            "eth_getTransactionReceipt",
            &[("txhash", format!("{:#x}", hash))],
        )
        .await
    }

    async fn get_code(&self, address: Address, chain_id: u64) -> Result<RawBytecode, ProviderError> {
        let code: String = self
            .proxy_call(
                chain_id,
                "eth_getCode",
                &[
                    ("address", format!("{:#x}", address)),
                    ("tag", "latest".to_string()),
                ],
            )
            .await?;

        Ok(RawBytecode { address, code })
    }
}

/// Shared HTTP client builder: UA header + gzip, per-call timeout
pub(super) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ProviderError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_CONST));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .gzip(true)
        .build()
        .map_err(|e| {
            ProviderError::unreachable(ProviderId::Explorer, format!("HTTP client build: {}", e))
        })
}
