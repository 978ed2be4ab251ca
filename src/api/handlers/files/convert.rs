use axum::{Json, extract::State};

use super::types::*;
use crate::api::error::AppError;
use crate::models::ConversionKind;
use crate::services::error::LifecycleError;

#[utoipa::path(
    post,
    path = "/convert_all",
    request_body = ConvertAllRequest,
    responses(
        (status = 200, description = "Conversion finished", body = ConvertAllResponse),
        (status = 400, description = "No files provided, invalid conversion type or nothing converted"),
        (status = 500, description = "Conversion failed")
    ),
    tag = "files"
)]
pub async fn convert_all(
    State(state): State<crate::AppState>,
    Json(req): Json<ConvertAllRequest>,
) -> Result<Json<ConvertAllResponse>, AppError> {
    let file_ids = req.file_ids();
    if file_ids.is_empty() {
        return Err(LifecycleError::NoFilesProvided.into());
    }
    let kind: ConversionKind = req.conversion_type().parse()?;

    let download = state.manager.produce_batch(&file_ids, kind).await?;
    tracing::info!(
        "📦 Batch of {} ready at {} (archive: {})",
        file_ids.len(),
        download.stored_name,
        download.is_archive
    );

    Ok(Json(ConvertAllResponse {
        download_url: download.url(),
    }))
}
