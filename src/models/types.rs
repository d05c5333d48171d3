//! Canonical entity definitions
//!
//! Provider-agnostic shapes every raw response is normalized into. Raw
//! amounts are U256 (never floats); USD values are display-only f64 and
//! only computed when the holding's own decimals are known.
//!
//! Entities are immutable after the classifier runs: a refresh rebuilds the
//! whole `AnalysisResult` rather than patching it in place.

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::errors::ProviderError;
use crate::utils::numeric::format_units;

// ============================================
// ADDRESS
// ============================================

/// Wallet vs. contract classification for an address.
///
/// This is a provider-sourced fact (bytecode presence), never inferred from
/// transaction patterns. `Unknown` means no bytecode fragment arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Wallet,
    Contract,
    Unknown,
}

/// The subject of an analysis, lowercase-canonical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAddress {
    /// alloy Address displays as lowercase 0x hex, one canonical form
    /// regardless of the casing any provider returned
    pub value: Address,
    pub chain_id: u64,
    pub kind: AddressKind,
}

impl SubjectAddress {
    pub fn new(value: Address, chain_id: u64) -> Self {
        Self {
            value,
            chain_id,
            kind: AddressKind::Unknown,
        }
    }
}

// ============================================
// BALANCES & HOLDINGS
// ============================================

/// Native (gas) token balance of an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalance {
    pub address: Address,
    pub chain_id: u64,
    /// Wei-equivalent raw amount
    pub amount_raw: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,
    pub as_of: DateTime<Utc>,
}

impl NativeBalance {
    /// Native decimals are a chain property (18 on all supported chains)
    pub fn formatted(&self) -> String {
        format_units(self.amount_raw, crate::utils::constants::NATIVE_DECIMALS)
    }
}

/// One ERC-20 holding of an address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenHolding {
    pub owner_address: Address,
    pub token_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// None when the provider omitted decimals. Never defaulted to 18 -
    /// that silently corrupts non-standard tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    pub amount_raw: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_usd: Option<f64>,
    pub verified: bool,
    /// Heuristic spam likelihood in [0, 1]
    pub spam_score: f64,
}

impl TokenHolding {
    /// True when decimals were missing upstream; such holdings never enter
    /// USD totals or formatted views.
    pub fn decimals_unknown(&self) -> bool {
        self.decimals.is_none()
    }

    /// Display amount using this holding's own decimals
    pub fn formatted(&self) -> Option<String> {
        self.decimals.map(|d| format_units(self.amount_raw, d))
    }
}

// ============================================
// TRANSACTIONS
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Success,
    Failed,
    Pending,
}

/// ERC-20 transfer emitted inside a transaction, ordered by log index.
/// Execution order matters for before/after balance reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTransferEvent {
    pub from: Address,
    pub to: Address,
    pub token_address: Address,
    pub amount_raw: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    pub log_index: u64,
}

/// A mined (or pending) transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: B256,
    pub chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    pub from: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    pub value_raw: U256,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<U256>,
    pub status: TxStatus,
    /// First 4 bytes of calldata, None for plain transfers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_id: Option<String>,
    pub token_transfers: Vec<TokenTransferEvent>,
}

// ============================================
// VERIFICATION
// ============================================

/// Contract source verification status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractVerification {
    pub address: Address,
    pub chain_id: u64,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization_runs: Option<u32>,
    pub is_proxy: bool,
}

// ============================================
// APPROVALS & DELEGATION
// ============================================

/// An outstanding ERC-20 allowance granted by the subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRecord {
    pub token_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    pub spender: Address,
    pub allowance_raw: U256,
}

/// An active EIP-7702 account delegation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountDelegation {
    pub delegate: Address,
}

// ============================================
// RISK ASSESSMENT
// ============================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskSeverity {
    None,
    Low,
    Medium,
    High,
}

impl RiskSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RiskCategory {
    Approval,
    Delegation,
    Honeypot,
    SpamToken,
}

/// One detected risk signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskFinding {
    pub category: RiskCategory,
    pub severity: RiskSeverity,
    pub description: String,
}

/// Derived risk view over an aggregated result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    pub subject_address: Address,
    pub overall_risk: RiskSeverity,
    pub findings: Vec<RiskFinding>,
}

// ============================================
// ANALYSIS RESULT (root aggregate)
// ============================================

/// The root aggregate returned to callers.
///
/// Always returned, even when every provider failed: partial data outranks
/// no data, and `provider_errors` tells the caller which fragments are
/// missing so "data unavailable from X" can be rendered per fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub subject: SubjectAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_balance: Option<NativeBalance>,
    pub token_holdings: Vec<TokenHolding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<ContractVerification>,
    pub approvals: Vec<ApprovalRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delegation: Option<AccountDelegation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
    /// True when a required provider failed terminally or the outer
    /// deadline expired before all fragments settled
    pub partial: bool,
    pub provider_errors: Vec<ProviderError>,
    pub resolved_at: DateTime<Utc>,
}

impl AnalysisResult {
    /// Empty skeleton for a subject; the aggregator fills it fragment by
    /// fragment and the classifier annotates it last.
    pub fn empty(subject: SubjectAddress) -> Self {
        Self {
            subject,
            native_balance: None,
            token_holdings: Vec::new(),
            transaction: None,
            verification: None,
            approvals: Vec::new(),
            delegation: None,
            risk: None,
            partial: false,
            provider_errors: Vec::new(),
            resolved_at: Utc::now(),
        }
    }

    /// Holdings for the primary display view: spam-scored and zero-balance
    /// holdings are excluded here but retained in `token_holdings`.
    pub fn primary_holdings(&self) -> Vec<&TokenHolding> {
        self.token_holdings
            .iter()
            .filter(|h| h.spam_score < 0.5 && !h.amount_raw.is_zero())
            .collect()
    }

    /// USD total over primary holdings; holdings with unknown decimals
    /// contribute nothing rather than a guessed value.
    pub fn primary_usd_total(&self) -> f64 {
        let mut total: f64 = self
            .primary_holdings()
            .iter()
            .filter(|h| !h.decimals_unknown())
            .filter_map(|h| h.amount_usd)
            .sum();
        if let Some(native) = &self.native_balance {
            total += native.amount_usd.unwrap_or(0.0);
        }
        total
    }
}

// ============================================
// MARKET SNAPSHOT
// ============================================

/// Spot market data for one symbol (standalone operation, not part of the
/// address/tx/contract fan-out)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price_usd: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_usd: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h_usd: Option<f64>,
    pub as_of: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn holding(amount: u64, spam: f64, decimals: Option<u8>, usd: Option<f64>) -> TokenHolding {
        TokenHolding {
            owner_address: Address::ZERO,
            token_address: Address::from_str("0xdAC17F958D2ee523a2206206994597C13D831ec7")
                .expect("static address"),
            symbol: Some("TST".to_string()),
            name: Some("Test".to_string()),
            decimals,
            amount_raw: U256::from(amount),
            amount_usd: usd,
            verified: true,
            spam_score: spam,
        }
    }

    #[test]
    fn test_primary_holdings_filters_spam_and_zero() {
        let subject = SubjectAddress::new(Address::ZERO, 1);
        let mut result = AnalysisResult::empty(subject);
        result.token_holdings = vec![
            holding(100, 0.0, Some(18), Some(5.0)),
            holding(100, 0.9, Some(18), Some(5.0)), // spam
            holding(0, 0.0, Some(18), Some(5.0)),   // zero balance
        ];

        assert_eq!(result.primary_holdings().len(), 1);
        assert_eq!(result.token_holdings.len(), 3);
    }

    #[test]
    fn test_usd_total_skips_unknown_decimals() {
        let subject = SubjectAddress::new(Address::ZERO, 1);
        let mut result = AnalysisResult::empty(subject);
        result.token_holdings = vec![
            holding(100, 0.0, Some(18), Some(10.0)),
            holding(100, 0.0, None, Some(999.0)), // decimals unknown, must not count
        ];

        assert_eq!(result.primary_usd_total(), 10.0);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(RiskSeverity::High > RiskSeverity::Medium);
        assert!(RiskSeverity::Medium > RiskSeverity::Low);
        assert!(RiskSeverity::Low > RiskSeverity::None);
    }

    #[test]
    fn test_native_balance_formatting() {
        let balance = NativeBalance {
            address: Address::ZERO,
            chain_id: 10,
            amount_raw: U256::from(10).pow(U256::from(18)),
            amount_usd: None,
            as_of: Utc::now(),
        };
        assert_eq!(balance.formatted(), "1.000000");
    }
}
