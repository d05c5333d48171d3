//! Contract Verification Registry Client - Sourcify
//!
//! GET /v2/contract/{chainId}/{address} on sourcify.dev. Free, no API key.
//! A 404 here is a real answer ("not verified"), not a transport failure -
//! the normalizer turns it into `is_verified: false` rather than an error.
//!
//! The registry is the authoritative source for `is_verified` in the
//! aggregator's conflict-resolution rules.

use alloy_primitives::Address;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::explorer::build_http_client;
use super::{ProviderId, RegistryApi};
use crate::models::errors::{ProviderError, ProviderErrorKind};

// ============================================
// RAW RESPONSE TYPES
// ============================================

/// Verification lookup result
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RawVerification {
    /// "exact_match" | "match" | absent
    #[serde(default)]
    pub match_status: Option<String>,
    #[serde(default)]
    pub compilation: Option<RawCompilation>,
    #[serde(default)]
    pub proxy_resolution: Option<RawProxyResolution>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCompilation {
    #[serde(default)]
    pub compiler_version: Option<String>,
    #[serde(default)]
    pub optimization_enabled: Option<bool>,
    #[serde(default)]
    pub optimization_runs: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProxyResolution {
    #[serde(default)]
    pub is_proxy: Option<bool>,
}

impl RawVerification {
    /// An unverified contract, as synthesized from a registry 404
    pub fn unverified() -> Self {
        Self::default()
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.match_status.as_deref(), Some("exact_match") | Some("match"))
    }
}

// ============================================
// CLIENT
// ============================================

/// Sourcify registry client
pub struct SourcifyClient {
    client: reqwest::Client,
    base_url: String,
}

impl SourcifyClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let client = build_http_client(timeout)?;
        Ok(Self { client, base_url })
    }
}

#[async_trait::async_trait]
impl RegistryApi for SourcifyClient {
    async fn get_verification(
        &self,
        address: Address,
        chain_id: u64,
    ) -> Result<RawVerification, ProviderError> {
        let url = format!(
            "{}/v2/contract/{}/{:#x}?fields=compilation,proxyResolution",
            self.base_url, chain_id, address
        );
        debug!("Registry call: verification for {:#x} (chain {})", address, chain_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(ProviderId::Registry, e))?;

        let status = response.status();
        if status.as_u16() == 404 {
            // Not in the registry = not verified, a valid answer
            return Ok(RawVerification::unverified());
        }
        if !status.is_success() {
            return Err(ProviderError::from_status(ProviderId::Registry, status));
        }

        response.json().await.map_err(|e| {
            ProviderError::new(ProviderId::Registry, ProviderErrorKind::MalformedResponse, e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_is_verified() {
        let raw: RawVerification = serde_json::from_str(
            r#"{
                "matchStatus": "exact_match",
                "compilation": {"compilerVersion": "0.8.19+commit.7dd6d404", "optimizationEnabled": true, "optimizationRuns": 200}
            }"#,
        )
        .expect("parse");

        assert!(raw.is_verified());
        let compilation = raw.compilation.expect("compilation");
        assert_eq!(compilation.optimization_runs, Some(200));
    }

    #[test]
    fn test_unverified_synthesized_from_404() {
        let raw = RawVerification::unverified();
        assert!(!raw.is_verified());
        assert!(raw.compilation.is_none());
    }

    #[test]
    fn test_unknown_match_status_not_verified() {
        let raw: RawVerification =
            serde_json::from_str(r#"{"matchStatus": "pending"}"#).expect("parse");
        assert!(!raw.is_verified());
    }
}
