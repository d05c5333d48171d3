//! Query parsing and validation
//!
//! Caller input is validated here, before any provider dispatch. A bad
//! address/hash/chain id fails fast with `QueryValidationError` and never
//! costs an outbound call.

use alloy_primitives::{Address, B256};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::models::errors::QueryValidationError;
use crate::utils::constants::is_supported_chain;

/// What kind of subject a query targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Address,
    Transaction,
    Contract,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Address => "address",
            Self::Transaction => "transaction",
            Self::Contract => "contract",
        }
    }
}

/// A validated analysis query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisQuery {
    /// Wallet-style lookup: balances, holdings, approvals, classification
    Address { address: Address, chain_id: u64 },
    /// Transaction lookup by hash
    Transaction { hash: B256, chain_id: u64 },
    /// Contract lookup: bytecode + verification status
    Contract { address: Address, chain_id: u64 },
}

impl AnalysisQuery {
    /// Validate caller input for an address analysis
    pub fn address(value: &str, chain_id: u64) -> Result<Self, QueryValidationError> {
        let address = parse_address(value)?;
        check_chain(chain_id)?;
        Ok(Self::Address { address, chain_id })
    }

    /// Validate caller input for a transaction analysis
    pub fn transaction(value: &str, chain_id: u64) -> Result<Self, QueryValidationError> {
        let hash = parse_tx_hash(value)?;
        check_chain(chain_id)?;
        Ok(Self::Transaction { hash, chain_id })
    }

    /// Validate caller input for a contract analysis
    pub fn contract(value: &str, chain_id: u64) -> Result<Self, QueryValidationError> {
        let address = parse_address(value)?;
        check_chain(chain_id)?;
        Ok(Self::Contract { address, chain_id })
    }

    pub fn kind(&self) -> QueryKind {
        match self {
            Self::Address { .. } => QueryKind::Address,
            Self::Transaction { .. } => QueryKind::Transaction,
            Self::Contract { .. } => QueryKind::Contract,
        }
    }

    pub fn chain_id(&self) -> u64 {
        match self {
            Self::Address { chain_id, .. }
            | Self::Transaction { chain_id, .. }
            | Self::Contract { chain_id, .. } => *chain_id,
        }
    }

    /// Cache/de-duplication key: kind + lowercase value + chain id.
    /// Two queries that differ only in input casing share one key.
    pub fn key(&self) -> QueryKey {
        let value = match self {
            Self::Address { address, .. } | Self::Contract { address, .. } => {
                format!("{:#x}", address)
            }
            Self::Transaction { hash, .. } => format!("{:#x}", hash),
        };
        QueryKey {
            kind: self.kind(),
            value,
            chain_id: self.chain_id(),
        }
    }
}

/// Normalized cache/in-flight key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub kind: QueryKind,
    pub value: String,
    pub chain_id: u64,
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind.as_str(), self.value, self.chain_id)
    }
}

fn parse_address(value: &str) -> Result<Address, QueryValidationError> {
    Address::from_str(value.trim()).map_err(|_| QueryValidationError::invalid_address(value))
}

fn parse_tx_hash(value: &str) -> Result<B256, QueryValidationError> {
    B256::from_str(value.trim()).map_err(|_| QueryValidationError::invalid_tx_hash(value))
}

fn check_chain(chain_id: u64) -> Result<(), QueryValidationError> {
    if is_supported_chain(chain_id) {
        Ok(())
    } else {
        Err(QueryValidationError::unsupported_chain(chain_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USDT: &str = "0xdAC17F958D2ee523a2206206994597C13D831ec7";

    #[test]
    fn test_address_query_parses() {
        let query = AnalysisQuery::address(USDT, 1).expect("valid");
        assert_eq!(query.kind(), QueryKind::Address);
        assert_eq!(query.chain_id(), 1);
    }

    #[test]
    fn test_address_query_rejects_short_hex() {
        assert!(AnalysisQuery::address("0x1234", 1).is_err());
        assert!(AnalysisQuery::address("not-an-address", 1).is_err());
    }

    #[test]
    fn test_unsupported_chain_rejected() {
        let err = AnalysisQuery::address(USDT, 424242).expect_err("bad chain");
        assert_eq!(err.code, "QUERY_UNSUPPORTED_CHAIN");
    }

    #[test]
    fn test_tx_hash_validation() {
        let hash = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        assert!(AnalysisQuery::transaction(hash, 1).is_ok());
        assert!(AnalysisQuery::transaction("0xdeadbeef", 1).is_err());
    }

    #[test]
    fn test_key_is_casing_insensitive() {
        let a = AnalysisQuery::address(USDT, 1).expect("valid");
        let b = AnalysisQuery::address(&USDT.to_lowercase(), 1).expect("valid");
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn test_key_distinguishes_kind_and_chain() {
        let a = AnalysisQuery::address(USDT, 1).expect("valid");
        let c = AnalysisQuery::contract(USDT, 1).expect("valid");
        let a10 = AnalysisQuery::address(USDT, 10).expect("valid");
        assert_ne!(a.key(), c.key());
        assert_ne!(a.key(), a10.key());
    }
}
