//! Normalizer - raw provider responses to canonical fragments
//!
//! Pure functions, no I/O. Each provider's response shape is validated here
//! so malformed upstream data fails closed (record or fragment dropped with
//! a warn log) instead of leaking `null`-shaped garbage into the merge.
//!
//! Rules applied uniformly:
//! - raw amounts parse as U256, never through floating point
//! - missing optional fields become None, never a thrown error
//! - symbol/name are trimmed, empty strings coerced to None
//! - a holding that arrives without decimals stays decimals-unknown and is
//!   excluded from USD computation (never default-assumed to 18)

use alloy_primitives::{Address, B256, U256};
use chrono::{DateTime, Utc};
use std::str::FromStr;
use tracing::warn;

use crate::models::errors::NormalizationError;
use crate::models::types::{
    AccountDelegation, AddressKind, ApprovalRecord, ContractVerification, NativeBalance,
    TokenHolding, TokenTransferEvent, TransactionRecord, TxStatus,
};
use crate::providers::{
    ProviderId, RawApproval, RawBytecode, RawNativeBalance, RawReceipt, RawTokenBalance,
    RawTransaction, RawVerification,
};
use crate::utils::constants::DELEGATION_DESIGNATOR_PREFIX;
use crate::utils::numeric::parse_raw_amount;

/// keccak256("Transfer(address,address,uint256)")
const TRANSFER_TOPIC: &str = "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef";

// ============================================
// TAGGED UNIONS
// ============================================

/// Raw response plus the context needed to normalize it. Providers hand
/// these to the aggregator; nothing downstream touches provider shapes.
#[derive(Debug, Clone)]
pub enum RawProviderResponse {
    NativeBalance {
        address: Address,
        chain_id: u64,
        raw: RawNativeBalance,
    },
    TokenBalances {
        owner: Address,
        raw: Vec<RawTokenBalance>,
    },
    Transaction {
        chain_id: u64,
        raw: RawTransaction,
    },
    Receipt {
        raw: RawReceipt,
    },
    Bytecode {
        raw: RawBytecode,
    },
    Verification {
        address: Address,
        chain_id: u64,
        raw: RawVerification,
    },
    Approvals {
        raw: Vec<RawApproval>,
    },
}

/// One provider's response in canonical shape, before merging
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFragment {
    pub provider: ProviderId,
    pub as_of: DateTime<Utc>,
    pub data: FragmentData,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentData {
    NativeBalance(NativeBalance),
    TokenHoldings(Vec<TokenHolding>),
    Transaction(TransactionRecord),
    /// Receipt half of a transaction; merged onto the envelope
    Receipt {
        status: TxStatus,
        gas_used: Option<u64>,
        transfers: Vec<TokenTransferEvent>,
    },
    /// Bytecode-derived facts: wallet/contract kind and EIP-7702 delegation
    Bytecode {
        kind: AddressKind,
        delegation: Option<AccountDelegation>,
    },
    Verification(ContractVerification),
    Approvals(Vec<ApprovalRecord>),
}

// ============================================
// ENTRY POINT
// ============================================

/// Normalize one raw response. Deterministic for a given `as_of`:
/// normalizing the same input twice yields identical fragments.
pub fn normalize(
    provider: ProviderId,
    response: RawProviderResponse,
    as_of: DateTime<Utc>,
) -> Result<NormalizedFragment, NormalizationError> {
    let data = match response {
        RawProviderResponse::NativeBalance {
            address,
            chain_id,
            raw,
        } => normalize_native_balance(provider, address, chain_id, raw, as_of)?,
        RawProviderResponse::TokenBalances { owner, raw } => {
            normalize_token_balances(provider, owner, raw)
        }
        RawProviderResponse::Transaction { chain_id, raw } => {
            normalize_transaction(provider, chain_id, raw)?
        }
        RawProviderResponse::Receipt { raw } => normalize_receipt(provider, raw),
        RawProviderResponse::Bytecode { raw } => normalize_bytecode(raw),
        RawProviderResponse::Verification {
            address,
            chain_id,
            raw,
        } => normalize_verification(address, chain_id, raw),
        RawProviderResponse::Approvals { raw } => normalize_approvals(provider, raw),
    };

    Ok(NormalizedFragment {
        provider,
        as_of,
        data,
    })
}

// ============================================
// PER-ENTITY ROUTINES
// ============================================

fn normalize_native_balance(
    provider: ProviderId,
    address: Address,
    chain_id: u64,
    raw: RawNativeBalance,
    as_of: DateTime<Utc>,
) -> Result<FragmentData, NormalizationError> {
    let amount_raw = parse_raw_amount(&raw.balance).ok_or_else(|| {
        NormalizationError::new(provider, "balance", format!("unparseable amount: {}", raw.balance))
    })?;

    Ok(FragmentData::NativeBalance(NativeBalance {
        address,
        chain_id,
        amount_raw,
        amount_usd: raw.usd_value,
        as_of,
    }))
}

fn normalize_token_balances(
    provider: ProviderId,
    owner: Address,
    raw: Vec<RawTokenBalance>,
) -> FragmentData {
    let holdings = raw
        .into_iter()
        .filter_map(|entry| match normalize_token_balance(provider, owner, entry) {
            Ok(holding) => Some(holding),
            Err(err) => {
                warn!("{}", err);
                None
            }
        })
        .collect();
    FragmentData::TokenHoldings(holdings)
}

fn normalize_token_balance(
    provider: ProviderId,
    owner: Address,
    raw: RawTokenBalance,
) -> Result<TokenHolding, NormalizationError> {
    let token_address = parse_address(provider, "token_address", &raw.token_address)?;
    let amount_raw = parse_raw_amount(&raw.balance).ok_or_else(|| {
        NormalizationError::new(provider, "balance", format!("unparseable amount: {}", raw.balance))
    })?;

    // USD values are only trusted when the holding's own decimals are known
    let amount_usd = if raw.decimals.is_some() { raw.usd_value } else { None };

    let spam_score = match (raw.possible_spam, raw.verified_contract) {
        (Some(true), _) => 1.0,
        (_, Some(true)) => 0.0,
        _ => 0.25,
    };

    Ok(TokenHolding {
        owner_address: owner,
        token_address,
        symbol: clean_string(raw.symbol),
        name: clean_string(raw.name),
        decimals: raw.decimals,
        amount_raw,
        amount_usd,
        verified: raw.verified_contract.unwrap_or(false),
        spam_score,
    })
}

fn normalize_transaction(
    provider: ProviderId,
    chain_id: u64,
    raw: RawTransaction,
) -> Result<FragmentData, NormalizationError> {
    let hash = B256::from_str(raw.hash.trim())
        .map_err(|_| NormalizationError::new(provider, "hash", raw.hash.clone()))?;
    let from = parse_address(provider, "from", &raw.from)?;
    let to = match raw.to.as_deref() {
        // Contract creation has no `to`
        None | Some("") => None,
        Some(value) => Some(parse_address(provider, "to", value)?),
    };

    let value_raw = raw
        .value
        .as_deref()
        .and_then(parse_raw_amount)
        .unwrap_or(U256::ZERO);
    let gas_price = raw.gas_price.as_deref().and_then(parse_raw_amount);
    let block_number = raw.block_number.as_deref().and_then(parse_hex_u64);

    let method_id = raw.input.as_deref().and_then(|input| {
        let trimmed = input.trim();
        // 0x + 4 selector bytes; plain transfers carry "0x". Calldata is
        // untrusted, so a selector that is not plain hex is dropped rather
        // than sliced blindly.
        trimmed
            .get(..10)
            .filter(|selector| selector.starts_with("0x") || selector.starts_with("0X"))
            .filter(|selector| selector[2..].bytes().all(|b| b.is_ascii_hexdigit()))
            .map(str::to_lowercase)
    });

    Ok(FragmentData::Transaction(TransactionRecord {
        hash,
        chain_id,
        block_number,
        from,
        to,
        value_raw,
        gas_used: None,
        gas_price,
        // Until the receipt fragment arrives, a tx without a block is
        // pending and a mined one is assumed successful
        status: if block_number.is_some() {
            TxStatus::Success
        } else {
            TxStatus::Pending
        },
        method_id,
        token_transfers: Vec::new(),
    }))
}

fn normalize_receipt(provider: ProviderId, raw: RawReceipt) -> FragmentData {
    let status = match raw.status.as_deref() {
        Some("0x1") => TxStatus::Success,
        Some("0x0") => TxStatus::Failed,
        _ => TxStatus::Pending,
    };
    let gas_used = raw.gas_used.as_deref().and_then(parse_hex_u64);

    let mut transfers: Vec<TokenTransferEvent> = raw
        .logs
        .iter()
        .filter_map(|log| {
            let transfer = normalize_transfer_log(provider, log);
            if let Err(err) = &transfer {
                warn!("{}", err);
            }
            transfer.ok().flatten()
        })
        .collect();

    // Execution order matters for before/after balance reconstruction
    transfers.sort_by_key(|t| t.log_index);

    FragmentData::Receipt {
        status,
        gas_used,
        transfers,
    }
}

/// Decode an ERC-20 Transfer log; Ok(None) for non-transfer events
fn normalize_transfer_log(
    provider: ProviderId,
    log: &crate::providers::RawLog,
) -> Result<Option<TokenTransferEvent>, NormalizationError> {
    if log.topics.first().map(|t| t.to_lowercase()) != Some(TRANSFER_TOPIC.to_string()) {
        return Ok(None);
    }
    if log.topics.len() < 3 {
        // ERC-721 style un-indexed transfers are not token transfers here
        return Ok(None);
    }

    let token_address = parse_address(provider, "log.address", &log.address)?;
    let from = parse_topic_address(provider, &log.topics[1])?;
    let to = parse_topic_address(provider, &log.topics[2])?;
    let amount_raw = log
        .data
        .as_deref()
        .and_then(parse_raw_amount)
        .ok_or_else(|| NormalizationError::new(provider, "log.data", "unparseable amount"))?;
    let log_index = log.log_index.as_deref().and_then(parse_hex_u64).unwrap_or(0);

    Ok(Some(TokenTransferEvent {
        from,
        to,
        token_address,
        amount_raw,
        // Receipts carry no token metadata; decimals stay unknown
        decimals: None,
        log_index,
    }))
}

fn normalize_bytecode(raw: RawBytecode) -> FragmentData {
    let code = raw.code.trim().to_lowercase();

    if code.starts_with(DELEGATION_DESIGNATOR_PREFIX) {
        // EIP-7702: delegated EOA, not a deployed contract
        let delegate = code
            .strip_prefix(DELEGATION_DESIGNATOR_PREFIX)
            .filter(|rest| rest.len() >= 40)
            .and_then(|rest| Address::from_str(&format!("0x{}", &rest[..40])).ok());
        return FragmentData::Bytecode {
            kind: AddressKind::Wallet,
            delegation: delegate.map(|delegate| AccountDelegation { delegate }),
        };
    }

    let kind = if code.is_empty() || code == "0x" {
        AddressKind::Wallet
    } else {
        AddressKind::Contract
    };

    FragmentData::Bytecode {
        kind,
        delegation: None,
    }
}

fn normalize_verification(address: Address, chain_id: u64, raw: RawVerification) -> FragmentData {
    let is_verified = raw.is_verified();
    let compilation = raw.compilation;
    FragmentData::Verification(ContractVerification {
        address,
        chain_id,
        is_verified,
        compiler_version: compilation
            .as_ref()
            .and_then(|c| clean_string(c.compiler_version.clone())),
        optimization_enabled: compilation.as_ref().and_then(|c| c.optimization_enabled),
        optimization_runs: compilation.as_ref().and_then(|c| c.optimization_runs),
        is_proxy: raw
            .proxy_resolution
            .and_then(|p| p.is_proxy)
            .unwrap_or(false),
    })
}

fn normalize_approvals(provider: ProviderId, raw: Vec<RawApproval>) -> FragmentData {
    let approvals = raw
        .into_iter()
        .filter_map(|entry| {
            let token_address = parse_address(provider, "token.address", &entry.token.address);
            let spender = parse_address(provider, "spender.address", &entry.spender.address);
            let allowance = parse_raw_amount(&entry.value);

            match (token_address, spender, allowance) {
                (Ok(token_address), Ok(spender), Some(allowance_raw)) => Some(ApprovalRecord {
                    token_address,
                    token_symbol: clean_string(entry.token.symbol),
                    spender,
                    allowance_raw,
                }),
                _ => {
                    warn!(
                        "{}",
                        NormalizationError::new(provider, "approval", "dropped malformed record")
                    );
                    None
                }
            }
        })
        .collect();
    FragmentData::Approvals(approvals)
}

// ============================================
// FIELD HELPERS
// ============================================

/// Trim and coerce empty strings to None
fn clean_string(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_address(
    provider: ProviderId,
    field: &'static str,
    value: &str,
) -> Result<Address, NormalizationError> {
    Address::from_str(value.trim())
        .map_err(|_| NormalizationError::new(provider, field, format!("bad address: {}", value)))
}

/// Address packed into the low 20 bytes of a 32-byte log topic
fn parse_topic_address(
    provider: ProviderId,
    topic: &str,
) -> Result<Address, NormalizationError> {
    let bytes = hex::decode(topic.trim().trim_start_matches("0x"))
        .map_err(|_| NormalizationError::new(provider, "topic", format!("bad topic: {}", topic)))?;
    if bytes.len() != 32 {
        return Err(NormalizationError::new(provider, "topic", format!("bad topic: {}", topic)));
    }
    Ok(Address::from_slice(&bytes[12..]))
}

fn parse_hex_u64(value: &str) -> Option<u64> {
    let stripped = value.trim().trim_start_matches("0x");
    u64::from_str_radix(stripped, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{RawApprovalSpender, RawApprovalToken, RawLog};

    fn owner() -> Address {
        Address::from_str("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").expect("static")
    }

    fn token_balance(decimals: Option<u8>) -> RawTokenBalance {
        RawTokenBalance {
            token_address: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            symbol: Some("  USDT ".to_string()),
            name: Some("".to_string()),
            decimals,
            balance: "1500000".to_string(),
            possible_spam: Some(false),
            verified_contract: Some(true),
            usd_price: Some(1.0),
            usd_value: Some(1.5),
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let as_of = Utc::now();
        let make = || {
            normalize(
                ProviderId::Indexer,
                RawProviderResponse::TokenBalances {
                    owner: owner(),
                    raw: vec![token_balance(Some(6))],
                },
                as_of,
            )
            .expect("normalize")
        };
        assert_eq!(make(), make());
    }

    #[test]
    fn test_symbol_trimmed_empty_name_coerced() {
        let fragment = normalize(
            ProviderId::Indexer,
            RawProviderResponse::TokenBalances {
                owner: owner(),
                raw: vec![token_balance(Some(6))],
            },
            Utc::now(),
        )
        .expect("normalize");

        let FragmentData::TokenHoldings(holdings) = fragment.data else {
            panic!("wrong fragment kind");
        };
        assert_eq!(holdings[0].symbol.as_deref(), Some("USDT"));
        assert_eq!(holdings[0].name, None);
    }

    #[test]
    fn test_missing_decimals_blocks_usd() {
        let fragment = normalize(
            ProviderId::Indexer,
            RawProviderResponse::TokenBalances {
                owner: owner(),
                raw: vec![token_balance(None)],
            },
            Utc::now(),
        )
        .expect("normalize");

        let FragmentData::TokenHoldings(holdings) = fragment.data else {
            panic!("wrong fragment kind");
        };
        assert!(holdings[0].decimals_unknown());
        assert_eq!(holdings[0].amount_usd, None);
    }

    #[test]
    fn test_malformed_record_dropped_not_fatal() {
        let mut bad = token_balance(Some(6));
        bad.balance = "not-a-number".to_string();
        let fragment = normalize(
            ProviderId::Indexer,
            RawProviderResponse::TokenBalances {
                owner: owner(),
                raw: vec![bad, token_balance(Some(6))],
            },
            Utc::now(),
        )
        .expect("normalize");

        let FragmentData::TokenHoldings(holdings) = fragment.data else {
            panic!("wrong fragment kind");
        };
        assert_eq!(holdings.len(), 1);
    }

    #[test]
    fn test_bytecode_classification() {
        let contract = normalize_bytecode(RawBytecode {
            address: owner(),
            code: "0x6080604052".to_string(),
        });
        assert!(matches!(
            contract,
            FragmentData::Bytecode {
                kind: AddressKind::Contract,
                delegation: None
            }
        ));

        let wallet = normalize_bytecode(RawBytecode {
            address: owner(),
            code: "0x".to_string(),
        });
        assert!(matches!(
            wallet,
            FragmentData::Bytecode {
                kind: AddressKind::Wallet,
                delegation: None
            }
        ));
    }

    #[test]
    fn test_delegation_designator_detected() {
        let delegated = normalize_bytecode(RawBytecode {
            address: owner(),
            code: format!("0xef0100{}", "d8da6bf26964af9d7eed9e03e53415d37aa96045"),
        });
        let FragmentData::Bytecode { kind, delegation } = delegated else {
            panic!("wrong fragment kind");
        };
        assert_eq!(kind, AddressKind::Wallet);
        assert_eq!(delegation.expect("delegation").delegate, owner());
    }

    #[test]
    fn test_transfer_log_decoding_ordered_by_log_index() {
        let log = |idx: &str| RawLog {
            address: "0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string(),
            topics: vec![
                TRANSFER_TOPIC.to_string(),
                "0x000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045".to_string(),
                "0x000000000000000000000000f02c1c8e6114b1dbe8937a39260b5b0a374432bb".to_string(),
            ],
            data: Some("0xde0b6b3a7640000".to_string()),
            log_index: Some(idx.to_string()),
        };

        let fragment = normalize_receipt(
            ProviderId::Explorer,
            RawReceipt {
                status: Some("0x1".to_string()),
                gas_used: Some("0x5208".to_string()),
                logs: vec![log("0x5"), log("0x2")],
            },
        );

        let FragmentData::Receipt { status, gas_used, transfers } = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(status, TxStatus::Success);
        assert_eq!(gas_used, Some(21000));
        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].log_index, 2);
        assert_eq!(transfers[1].log_index, 5);
        assert_eq!(transfers[0].from, owner());
    }

    #[test]
    fn test_method_id_extraction() {
        let raw = RawTransaction {
            hash: "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string(),
            block_number: Some("0x10".to_string()),
            from: "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string(),
            to: Some("0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string()),
            value: Some("0x0".to_string()),
            gas_price: Some("0x4a817c800".to_string()),
            input: Some("0xA9059CBB0000000000000000000000".to_string()),
        };

        let fragment = normalize_transaction(ProviderId::Explorer, 1, raw).expect("normalize");
        let FragmentData::Transaction(tx) = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(tx.method_id.as_deref(), Some("0xa9059cbb"));
        assert_eq!(tx.block_number, Some(16));
    }

    #[test]
    fn test_garbled_input_drops_method_id_without_panicking() {
        // A multi-byte character straddling the selector boundary must not
        // bring down the resolution task
        let raw = RawTransaction {
            hash: "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string(),
            block_number: Some("0x10".to_string()),
            from: "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string(),
            to: Some("0xdAC17F958D2ee523a2206206994597C13D831ec7".to_string()),
            value: None,
            gas_price: None,
            input: Some("0xa9059cb\u{e9}-garbage".to_string()),
        };

        let fragment = normalize_transaction(ProviderId::Explorer, 1, raw).expect("normalize");
        let FragmentData::Transaction(tx) = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(tx.method_id, None);
    }

    #[test]
    fn test_non_hex_selector_drops_method_id() {
        let raw = RawTransaction {
            hash: "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string(),
            block_number: None,
            from: "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string(),
            to: None,
            value: None,
            gas_price: None,
            input: Some("0xzz59cbb0raw".to_string()),
        };

        let fragment = normalize_transaction(ProviderId::Explorer, 1, raw).expect("normalize");
        let FragmentData::Transaction(tx) = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(tx.method_id, None);
    }

    #[test]
    fn test_plain_transfer_has_no_method_id() {
        let raw = RawTransaction {
            hash: "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b".to_string(),
            block_number: None,
            from: "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045".to_string(),
            to: None,
            value: None,
            gas_price: None,
            input: Some("0x".to_string()),
        };

        let fragment = normalize_transaction(ProviderId::Explorer, 1, raw).expect("normalize");
        let FragmentData::Transaction(tx) = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(tx.method_id, None);
        assert_eq!(tx.status, TxStatus::Pending);
        assert_eq!(tx.value_raw, U256::ZERO);
    }

    #[test]
    fn test_approval_normalization_drops_bad_records() {
        let good = RawApproval {
            token: RawApprovalToken {
                address: "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48".to_string(),
                symbol: Some("USDC".to_string()),
            },
            spender: RawApprovalSpender {
                address: "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45".to_string(),
            },
            value: U256::MAX.to_string(),
        };
        let bad = RawApproval {
            token: RawApprovalToken {
                address: "garbage".to_string(),
                symbol: None,
            },
            spender: RawApprovalSpender {
                address: "0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45".to_string(),
            },
            value: "1".to_string(),
        };

        let fragment = normalize_approvals(ProviderId::Indexer, vec![good, bad]);
        let FragmentData::Approvals(approvals) = fragment else {
            panic!("wrong fragment kind");
        };
        assert_eq!(approvals.len(), 1);
        assert_eq!(approvals[0].allowance_raw, U256::MAX);
    }
}
