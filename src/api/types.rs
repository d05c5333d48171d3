//! API Request/Response Types

use serde::{Deserialize, Serialize};

use crate::models::errors::{ProviderError, QueryValidationError};
use crate::models::types::{AnalysisResult, MarketSnapshot};
use crate::utils::cache::CacheStats;

/// API Response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
    pub latency_ms: f64,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T, latency_ms: f64) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(error: ApiError, latency_ms: f64) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            latency_ms,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// API Error
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
        }
    }
}

impl From<&QueryValidationError> for ApiError {
    fn from(err: &QueryValidationError) -> Self {
        Self {
            code: err.code.to_string(),
            message: err.message.clone(),
        }
    }
}

impl From<&ProviderError> for ApiError {
    fn from(err: &ProviderError) -> Self {
        Self {
            code: err.kind.as_str().to_string(),
            message: err.to_string(),
        }
    }
}

// ============================================
// Analysis
// ============================================

/// Body for the three analyze endpoints. `value` is an address or a
/// transaction hash depending on the route.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub value: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    /// Drop any cached result and resolve fresh
    #[serde(default)]
    pub refresh: bool,
}

fn default_chain_id() -> u64 {
    1
}

pub type AnalysisData = AnalysisResult;
pub type MarketData = MarketSnapshot;

// ============================================
// Health & Stats
// ============================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsData {
    pub cache: CacheStats,
    pub in_flight: usize,
    pub uptime_seconds: u64,
}
