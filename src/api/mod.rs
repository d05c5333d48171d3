//! HTTP surface for the analysis engine

pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod types;

pub use routes::create_router;
pub use types::*;

use std::sync::Arc;

use handlers::AppState;

/// Periodic maintenance: sweep expired cache entries and stale rate-limit
/// windows. Runs until the process exits.
pub fn start_cleanup_task(state: Arc<AppState>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            state.engine.sweep_cache();
            state.limiter.cleanup();
        }
    });
}
