//! Centralized Error Handling Module
//!
//! Every failure carries a unique string code for log grep-ability.
//! Three families, matching how failures propagate:
//! - `ProviderError`   - transport/provider level, accumulated per request
//! - `QueryValidationError` - caller input, fails fast before any dispatch
//! - `NormalizationError`   - raw response could not be mapped, fragment dropped
//!
//! Nothing in this crate panics on upstream garbage: a failing provider
//! degrades the result to `partial = true`, never the whole analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::providers::ProviderId;

// ============================================
// PROVIDER ERRORS
// ============================================

/// Classification of a provider failure.
///
/// Retryable kinds indicate a transient condition worth another attempt;
/// terminal kinds mean the query cannot succeed against that provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderErrorKind {
    /// Call exceeded its per-provider timeout
    Timeout,
    /// Provider returned HTTP 429 or an explicit rate-limit error
    RateLimited,
    /// Missing or rejected API key (HTTP 401/403)
    Unauthorized,
    /// Provider has no data for the subject (HTTP 404 or empty result)
    NotFound,
    /// Response arrived but could not be parsed into the expected shape
    MalformedResponse,
    /// Connection-level failure (DNS, refused, reset)
    Unreachable,
}

impl ProviderErrorKind {
    /// Unique code for logging/monitoring
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "PROVIDER_TIMEOUT",
            Self::RateLimited => "PROVIDER_RATE_LIMITED",
            Self::Unauthorized => "PROVIDER_UNAUTHORIZED",
            Self::NotFound => "PROVIDER_NOT_FOUND",
            Self::MalformedResponse => "PROVIDER_MALFORMED_RESPONSE",
            Self::Unreachable => "PROVIDER_UNREACHABLE",
        }
    }

    /// Retryable kinds drive the aggregator's retry policy
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::Unreachable)
    }
}

/// A failure from one upstream provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    pub provider: ProviderId,
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: ProviderId, kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(provider: ProviderId) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout, "Call timed out")
    }

    pub fn rate_limited(provider: ProviderId) -> Self {
        Self::new(provider, ProviderErrorKind::RateLimited, "Rate limited (HTTP 429)")
    }

    pub fn unauthorized(provider: ProviderId) -> Self {
        Self::new(provider, ProviderErrorKind::Unauthorized, "Invalid or missing API key")
    }

    pub fn not_found(provider: ProviderId, msg: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::NotFound, msg)
    }

    pub fn malformed(provider: ProviderId, msg: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::MalformedResponse, msg)
    }

    pub fn unreachable(provider: ProviderId, msg: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Unreachable, msg)
    }

    /// Classify a reqwest transport error
    pub fn from_reqwest(provider: ProviderId, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(provider)
        } else if err.is_connect() {
            Self::unreachable(provider, err.to_string())
        } else if err.is_decode() {
            Self::malformed(provider, err.to_string())
        } else {
            Self::unreachable(provider, err.to_string())
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(provider: ProviderId, status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::rate_limited(provider),
            401 | 403 => Self::unauthorized(provider),
            404 => Self::not_found(provider, "Resource not found"),
            _ => Self::unreachable(provider, format!("HTTP error: {}", status)),
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind.as_str(), self.provider.as_str(), self.message)
    }
}

impl std::error::Error for ProviderError {}

// ============================================
// QUERY VALIDATION ERRORS
// ============================================

/// Malformed caller input. Returned synchronously, never reaches a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryValidationError {
    pub code: &'static str,
    pub message: String,
}

impl QueryValidationError {
    pub fn invalid_address(value: &str) -> Self {
        Self {
            code: "QUERY_INVALID_ADDRESS",
            message: format!("Not a 20-byte hex address: {}", value),
        }
    }

    pub fn invalid_tx_hash(value: &str) -> Self {
        Self {
            code: "QUERY_INVALID_TX_HASH",
            message: format!("Not a 32-byte hex transaction hash: {}", value),
        }
    }

    pub fn unsupported_chain(chain_id: u64) -> Self {
        Self {
            code: "QUERY_UNSUPPORTED_CHAIN",
            message: format!("Unsupported chain_id: {}", chain_id),
        }
    }

    pub fn invalid_symbol(symbol: &str) -> Self {
        Self {
            code: "QUERY_UNKNOWN_SYMBOL",
            message: format!("No market mapping for symbol: {}", symbol),
        }
    }

    /// HTTP status for API responses - validation is always the caller's fault
    pub fn http_status(&self) -> u16 {
        400
    }
}

impl fmt::Display for QueryValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for QueryValidationError {}

// ============================================
// NORMALIZATION ERRORS
// ============================================

/// A raw provider response (or one record inside it) could not be mapped to
/// a canonical field. Logged and dropped, never fatal to the request.
#[derive(Debug, Clone)]
pub struct NormalizationError {
    pub provider: ProviderId,
    pub field: &'static str,
    pub message: String,
}

impl NormalizationError {
    pub fn new(provider: ProviderId, field: &'static str, message: impl Into<String>) -> Self {
        Self {
            provider,
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for NormalizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[NORMALIZATION_DROPPED] {} field {}: {}",
            self.provider.as_str(),
            self.field,
            self.message
        )
    }
}

impl std::error::Error for NormalizationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(ProviderErrorKind::RateLimited.is_retryable());
        assert!(ProviderErrorKind::Unreachable.is_retryable());
        assert!(!ProviderErrorKind::Unauthorized.is_retryable());
        assert!(!ProviderErrorKind::NotFound.is_retryable());
        assert!(!ProviderErrorKind::MalformedResponse.is_retryable());
    }

    #[test]
    fn test_status_mapping() {
        let err = ProviderError::from_status(
            ProviderId::Explorer,
            reqwest::StatusCode::TOO_MANY_REQUESTS,
        );
        assert_eq!(err.kind, ProviderErrorKind::RateLimited);

        let err = ProviderError::from_status(ProviderId::Indexer, reqwest::StatusCode::UNAUTHORIZED);
        assert_eq!(err.kind, ProviderErrorKind::Unauthorized);

        let err = ProviderError::from_status(ProviderId::Registry, reqwest::StatusCode::NOT_FOUND);
        assert_eq!(err.kind, ProviderErrorKind::NotFound);
    }

    #[test]
    fn test_error_codes() {
        let err = ProviderError::timeout(ProviderId::Explorer);
        assert_eq!(err.kind.as_str(), "PROVIDER_TIMEOUT");
        assert!(err.to_string().contains("etherscan"));
    }

    #[test]
    fn test_provider_errors_compare_by_value() {
        // AnalysisResult equality walks into accumulated provider errors
        let a = ProviderError::timeout(ProviderId::Explorer);
        let b = ProviderError::timeout(ProviderId::Explorer);
        let c = ProviderError::timeout(ProviderId::Indexer);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_validation_error_status() {
        let err = QueryValidationError::invalid_address("0x123");
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.code, "QUERY_INVALID_ADDRESS");
    }
}
