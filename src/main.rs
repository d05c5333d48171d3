//! Walletscope API Server
//!
//! REST API for multi-source account, transaction and contract analysis.
//!
//! Usage:
//!   cargo run --bin walletscope_api
//!
//! Environment:
//!   HOST              - Server host (default: 0.0.0.0)
//!   PORT              - Server port (default: 3000)
//!   EXPLORER_API_KEY  - Etherscan v2 API key
//!   INDEXER_API_KEY   - Moralis API key
//!   MARKET_API_KEY    - CoinGecko key (optional)
//!   API_AUTH_KEY      - Inbound API key; unset = open API
//!   RUST_LOG          - Log filter (default: info)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use walletscope::api::{create_router, handlers::AppState, start_cleanup_task};
use walletscope::config::{mask_secret, EngineConfig, ServerConfig};
use walletscope::session::AnalysisEngine;
use walletscope::utils::constants::{APP_NAME, APP_VERSION};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let engine_config = EngineConfig::default();
    let server_config = ServerConfig::default();

    info!("{} v{}", APP_NAME, APP_VERSION);
    info!(
        "explorer: {} (key {})",
        engine_config.explorer_base_url,
        mask_secret(&engine_config.explorer_api_key)
    );
    info!(
        "indexer:  {} (key {})",
        engine_config.indexer_base_url,
        mask_secret(&engine_config.indexer_api_key)
    );
    info!("registry: {}", engine_config.registry_base_url);
    info!("market:   {}", engine_config.market_base_url);
    match &server_config.api_auth_key {
        Some(key) => info!("inbound auth: enabled (key {})", mask_secret(key)),
        None => info!("inbound auth: disabled"),
    }

    let engine = AnalysisEngine::new(&engine_config)?;
    let state = Arc::new(AppState::new(
        engine,
        server_config.api_auth_key.clone(),
    ));

    start_cleanup_task(state.clone());

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", server_config.host, server_config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    info!("listening on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /v1/analyze/address      - Balances, holdings, approvals, risk");
    info!("  POST /v1/analyze/transaction  - Envelope, receipt, token transfers");
    info!("  POST /v1/analyze/contract     - Bytecode kind + verification");
    info!("  GET  /v1/market/:symbol       - Spot market data");
    info!("  GET  /v1/stats                - Cache statistics");
    info!("  GET  /v1/health               - Health check");
    info!("Press Ctrl+C for graceful shutdown");

    let shutdown_signal = async {
        // Failure to install the handler leaves no way to shut down cleanly
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", err);
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Shutdown signal received, draining");
    Ok(())
}
