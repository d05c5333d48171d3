//! API Request Handlers

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
};
use std::sync::Arc;
use std::time::Instant;

use super::middleware::RateLimiter;
use super::types::*;
use crate::models::errors::QueryValidationError;
use crate::models::query::AnalysisQuery;
use crate::session::{AnalysisEngine, EngineError};
use crate::utils::constants::APP_VERSION;

/// Shared application state
pub struct AppState {
    pub engine: AnalysisEngine,
    pub limiter: Arc<RateLimiter>,
    /// Inbound API key; None means the API is open
    pub api_auth_key: Option<String>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(engine: AnalysisEngine, api_auth_key: Option<String>) -> Self {
        Self {
            engine,
            limiter: Arc::new(RateLimiter::default()),
            api_auth_key,
            start_time: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

type Rejection = (StatusCode, Json<ApiResponse<()>>);

fn reject_validation(err: &QueryValidationError, start: Instant) -> Rejection {
    (
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST),
        Json(ApiResponse::error(
            ApiError::from(err),
            start.elapsed().as_secs_f64() * 1000.0,
        )),
    )
}

// ============================================
// Health & Stats
// ============================================

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<ApiResponse<HealthData>> {
    let start = Instant::now();

    let data = HealthData {
        status: "healthy".to_string(),
        version: APP_VERSION.to_string(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<ApiResponse<StatsData>> {
    let start = Instant::now();

    let data = StatsData {
        cache: state.engine.cache_stats(),
        in_flight: state.engine.in_flight_count(),
        uptime_seconds: state.uptime_seconds(),
    };

    Json(ApiResponse::success(
        data,
        start.elapsed().as_secs_f64() * 1000.0,
    ))
}

// ============================================
// Analysis
// ============================================

pub async fn analyze_address(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalysisData>>, Rejection> {
    let start = Instant::now();

    let result = if req.refresh {
        let query = AnalysisQuery::address(&req.value, req.chain_id)
            .map_err(|e| reject_validation(&e, start))?;
        state.engine.refresh(query).await
    } else {
        state
            .engine
            .analyze_address(&req.value, req.chain_id)
            .await
            .map_err(|e| reject_validation(&e, start))?
    };

    Ok(Json(ApiResponse::success(
        result,
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}

pub async fn analyze_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalysisData>>, Rejection> {
    let start = Instant::now();

    let result = if req.refresh {
        let query = AnalysisQuery::transaction(&req.value, req.chain_id)
            .map_err(|e| reject_validation(&e, start))?;
        state.engine.refresh(query).await
    } else {
        state
            .engine
            .analyze_transaction(&req.value, req.chain_id)
            .await
            .map_err(|e| reject_validation(&e, start))?
    };

    Ok(Json(ApiResponse::success(
        result,
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}

pub async fn analyze_contract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<ApiResponse<AnalysisData>>, Rejection> {
    let start = Instant::now();

    let result = if req.refresh {
        let query = AnalysisQuery::contract(&req.value, req.chain_id)
            .map_err(|e| reject_validation(&e, start))?;
        state.engine.refresh(query).await
    } else {
        state
            .engine
            .analyze_contract(&req.value, req.chain_id)
            .await
            .map_err(|e| reject_validation(&e, start))?
    };

    Ok(Json(ApiResponse::success(
        result,
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}

// ============================================
// Market Data
// ============================================

pub async fn market_price(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<ApiResponse<MarketData>>, Rejection> {
    let start = Instant::now();

    let snapshot = state
        .engine
        .market_price(&symbol)
        .await
        .map_err(|err| match err {
            EngineError::Validation(e) => reject_validation(&e, start),
            EngineError::Provider(e) => (
                StatusCode::BAD_GATEWAY,
                Json(ApiResponse::error(
                    ApiError::from(&e),
                    start.elapsed().as_secs_f64() * 1000.0,
                )),
            ),
        })?;

    Ok(Json(ApiResponse::success(
        snapshot,
        start.elapsed().as_secs_f64() * 1000.0,
    )))
}
