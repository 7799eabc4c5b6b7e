// crates/server/src/routes/jobs.rs
//! API routes for separation jobs in flight.
//!
//! - GET /jobs - List running jobs
//! - GET /jobs/{id} - One running job

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::jobs::{JobId, JobSnapshot};
use crate::state::AppState;

/// GET /api/jobs - List running jobs, oldest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSnapshot>> {
    Json(state.jobs.snapshots())
}

/// GET /api/jobs/{id} - Snapshot of one running job.
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<JobId>,
) -> ApiResult<Json<JobSnapshot>> {
    state
        .jobs
        .get(id)
        .map(Json)
        .ok_or(ApiError::JobNotFound(id))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/{id}", get(get_job))
}
