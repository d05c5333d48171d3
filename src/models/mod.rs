//! Data model: canonical entities, queries, and the error taxonomy

pub mod errors;
pub mod query;
pub mod types;

pub use errors::{NormalizationError, ProviderError, ProviderErrorKind, QueryValidationError};
pub use query::{AnalysisQuery, QueryKey, QueryKind};
pub use types::{
    AccountDelegation, AddressKind, AnalysisResult, ApprovalRecord, ContractVerification,
    MarketSnapshot, NativeBalance, RiskAssessment, RiskCategory, RiskFinding, RiskSeverity,
    SubjectAddress, TokenHolding, TokenTransferEvent, TransactionRecord, TxStatus,
};
