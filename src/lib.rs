//! Walletscope Library
//!
//! Multi-source blockchain account analysis: fans one query out to a chain
//! explorer, a balance indexer and a verification registry, normalizes what
//! comes back into canonical entities, merges the fragments by authority
//! and classifies the result for risk signals:
//! - unlimited token approvals
//! - EIP-7702 account delegation
//! - spam/bait token holdings
//!
//! Resolution degrades instead of failing: a dead provider yields a partial
//! result with the failure recorded, never an error.

pub mod aggregator;
pub mod api;
pub mod classifier;
pub mod config;
pub mod models;
pub mod normalizer;
pub mod providers;
pub mod session;
pub mod utils;

pub use aggregator::Aggregator;
pub use classifier::classify;
pub use config::{EngineConfig, ServerConfig};
pub use models::errors::{NormalizationError, ProviderError, ProviderErrorKind, QueryValidationError};
pub use models::query::{AnalysisQuery, QueryKey, QueryKind};
pub use models::types::{
    AnalysisResult, MarketSnapshot, RiskAssessment, RiskCategory, RiskFinding, RiskSeverity,
};
pub use normalizer::{normalize, FragmentData, NormalizedFragment, RawProviderResponse};
pub use providers::{ProviderId, ProviderSet};
pub use session::{AnalysisEngine, EngineError};
pub use utils::cache::{CacheStats, ResultCache};
