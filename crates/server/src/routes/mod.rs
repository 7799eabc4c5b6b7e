//! Route handlers for the stemsplit server.

pub mod health;
pub mod jobs;
pub mod metrics;
pub mod progress;
pub mod separate;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router.
///
/// Routes:
/// - POST /separate - Run a separation and wait for its output paths
/// - GET  /ws/progress - WebSocket stream of `{"progress": n}` events
/// - GET  /api/health - Health check
/// - GET  /api/jobs - Jobs in flight
/// - GET  /api/jobs/{id} - One job in flight
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(separate::router())
        .merge(progress::router())
        .nest("/api", health::router())
        .nest("/api", jobs::router())
        .merge(metrics::router())
        .with_state(state)
}
