// crates/server/src/routes/separate.rs
//! Separation endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use stemsplit_core::{SeparationOutput, SeparationRequest};

use crate::error::ApiResult;
use crate::state::AppState;

/// Success body of `POST /separate`.
#[derive(Debug, Serialize)]
pub struct SeparateResponse {
    pub success: bool,
    #[serde(flatten)]
    pub output: SeparationOutput,
}

/// POST /separate - run one separation and wait for it to finish.
///
/// Progress for the job is pushed to `/ws/progress` subscribers meanwhile.
/// Body rejections are turned into the usual JSON error shape.
pub async fn separate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SeparationRequest>, JsonRejection>,
) -> ApiResult<Json<SeparateResponse>> {
    let Json(request) = payload?;
    let output = state.orchestrator.submit(request).await?;
    Ok(Json(SeparateResponse {
        success: true,
        output,
    }))
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/separate", post(separate))
}
