use axum::{Json, extract::State, response::IntoResponse};
use serde::Serialize;
use crate::AppState;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// Uploads waiting for conversion
    pub pending_files: usize,
    /// Converted files available for download
    pub converted_files: usize,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service health and pool sizes", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let pools = state.manager.pools();

    Json(HealthResponse {
        status: "ok".to_string(),
        pending_files: pools.pending.len(),
        converted_files: pools.outputs.len(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
