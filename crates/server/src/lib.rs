// crates/server/src/lib.rs
//! Stemsplit server library.
//!
//! Axum HTTP/WebSocket front of the stem separator: `POST /separate` runs a
//! job, `/ws/progress` streams its progress to every connected client.

pub mod cli;
pub mod error;
pub mod hub;
pub mod jobs;
pub mod metrics;
pub mod routes;
pub mod state;

pub use error::*;
pub use hub::{ProgressHub, SubscriberHandle, SubscriberId};
pub use metrics::init_metrics;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// CORS allows any origin: desktop front-ends call the service from their
/// own origin.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
