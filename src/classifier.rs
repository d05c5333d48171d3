//! Classifier - risk findings over an aggregated result
//!
//! Pure rules, no I/O. Runs once after the merge and annotates the result
//! with a `RiskAssessment`; nothing here mutates the underlying fragments.
//!
//! Rules:
//! - unlimited (or near-unlimited) token approval    -> high
//! - active account delegation (EIP-7702)            -> medium
//! - spam-scored holding reporting a fake USD value  -> medium (bait pattern)
//! - spam-scored or zero holdings present            -> low
//!
//! Overall risk is the maximum severity across findings.

use alloy_primitives::U256;

use crate::models::types::{
    AnalysisResult, RiskAssessment, RiskCategory, RiskFinding, RiskSeverity,
};

/// Allowances at or above 2^255 are treated as unlimited. Wallet UIs write
/// type(uint256).max but some tokens store max >> 1 or similar sentinels.
fn unlimited_threshold() -> U256 {
    U256::from(1) << 255usize
}

/// Annotate a merged result with its risk assessment
pub fn classify(result: &mut AnalysisResult) {
    let mut findings = Vec::new();

    for approval in &result.approvals {
        if approval.allowance_raw >= unlimited_threshold() {
            let token = approval
                .token_symbol
                .clone()
                .unwrap_or_else(|| format!("{:#x}", approval.token_address));
            findings.push(RiskFinding {
                category: RiskCategory::Approval,
                severity: RiskSeverity::High,
                description: format!(
                    "Unlimited {} approval granted to {:#x}",
                    token, approval.spender
                ),
            });
        }
    }

    if let Some(delegation) = &result.delegation {
        findings.push(RiskFinding {
            category: RiskCategory::Delegation,
            severity: RiskSeverity::Medium,
            description: format!(
                "Account delegates execution to {:#x}",
                delegation.delegate
            ),
        });
    }

    // Spam tokens that claim a USD value are the bait-airdrop pattern:
    // worthless token, inflated price feed, honeypot on the sell side
    let baited = result
        .token_holdings
        .iter()
        .filter(|h| h.spam_score >= 0.5 && h.amount_usd.unwrap_or(0.0) > 0.0)
        .count();
    if baited > 0 {
        findings.push(RiskFinding {
            category: RiskCategory::Honeypot,
            severity: RiskSeverity::Medium,
            description: format!(
                "{} spam-flagged holding(s) reporting a nonzero USD value",
                baited
            ),
        });
    }

    let filtered = result.token_holdings.len() - result.primary_holdings().len();
    if filtered > 0 {
        findings.push(RiskFinding {
            category: RiskCategory::SpamToken,
            severity: RiskSeverity::Low,
            description: format!("{} holding(s) hidden from the primary view", filtered),
        });
    }

    let overall_risk = findings
        .iter()
        .map(|f| f.severity)
        .max()
        .unwrap_or(RiskSeverity::None);

    result.risk = Some(RiskAssessment {
        subject_address: result.subject.value,
        overall_risk,
        findings,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::types::{
        AccountDelegation, AddressKind, ApprovalRecord, SubjectAddress, TokenHolding,
    };
    use alloy_primitives::Address;
    use std::str::FromStr;

    fn base_result() -> AnalysisResult {
        AnalysisResult::empty(SubjectAddress {
            value: Address::from_str("0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045").expect("valid"),
            chain_id: 1,
            kind: AddressKind::Wallet,
        })
    }

    fn holding(amount: u64, spam: f64, usd: Option<f64>) -> TokenHolding {
        TokenHolding {
            owner_address: Address::ZERO,
            token_address: Address::from_str("0xdAC17F958D2ee523a2206206994597C13D831ec7")
                .expect("valid"),
            symbol: Some("TST".to_string()),
            name: None,
            decimals: Some(18),
            amount_raw: U256::from(amount),
            amount_usd: usd,
            verified: false,
            spam_score: spam,
        }
    }

    fn approval(allowance: U256) -> ApprovalRecord {
        ApprovalRecord {
            token_address: Address::from_str("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
                .expect("valid"),
            token_symbol: Some("USDC".to_string()),
            spender: Address::from_str("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45")
                .expect("valid"),
            allowance_raw: allowance,
        }
    }

    #[test]
    fn test_clean_result_has_no_risk() {
        let mut result = base_result();
        result.token_holdings = vec![holding(100, 0.0, Some(5.0))];
        classify(&mut result);

        let risk = result.risk.expect("assessment");
        assert_eq!(risk.overall_risk, RiskSeverity::None);
        assert!(risk.findings.is_empty());
    }

    #[test]
    fn test_unlimited_approval_is_high() {
        let mut result = base_result();
        result.approvals = vec![approval(U256::MAX)];
        classify(&mut result);

        let risk = result.risk.expect("assessment");
        assert_eq!(risk.overall_risk, RiskSeverity::High);
        assert_eq!(risk.findings[0].category, RiskCategory::Approval);
    }

    #[test]
    fn test_bounded_approval_is_not_flagged() {
        let mut result = base_result();
        result.approvals = vec![approval(U256::from(1_000_000u64))];
        classify(&mut result);

        assert_eq!(
            result.risk.expect("assessment").overall_risk,
            RiskSeverity::None
        );
    }

    #[test]
    fn test_threshold_boundary() {
        let mut result = base_result();
        result.approvals = vec![approval(U256::from(1) << 255usize)];
        classify(&mut result);
        assert_eq!(
            result.risk.expect("assessment").overall_risk,
            RiskSeverity::High
        );
    }

    #[test]
    fn test_delegation_is_medium() {
        let mut result = base_result();
        result.delegation = Some(AccountDelegation {
            delegate: Address::ZERO,
        });
        classify(&mut result);

        let risk = result.risk.expect("assessment");
        assert_eq!(risk.overall_risk, RiskSeverity::Medium);
        assert_eq!(risk.findings[0].category, RiskCategory::Delegation);
    }

    #[test]
    fn test_spam_with_usd_value_is_bait() {
        let mut result = base_result();
        result.token_holdings = vec![holding(100, 1.0, Some(9999.0))];
        classify(&mut result);

        let risk = result.risk.expect("assessment");
        assert_eq!(risk.overall_risk, RiskSeverity::Medium);
        assert!(risk
            .findings
            .iter()
            .any(|f| f.category == RiskCategory::Honeypot));
        assert!(risk
            .findings
            .iter()
            .any(|f| f.category == RiskCategory::SpamToken));
    }

    #[test]
    fn test_overall_risk_is_max_severity() {
        let mut result = base_result();
        result.approvals = vec![approval(U256::MAX)];
        result.token_holdings = vec![holding(0, 0.0, None)]; // zero balance, low
        classify(&mut result);

        let risk = result.risk.expect("assessment");
        assert_eq!(risk.overall_risk, RiskSeverity::High);
        assert_eq!(risk.findings.len(), 2);
    }
}
