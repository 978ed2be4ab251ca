use axum::{
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::Response,
};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tokio_util::io::ReaderStream;

use crate::api::error::AppError;
use crate::utils::naming::split_extension;

const PPTX_MIME: &str = "application/vnd.openxmlformats-officedocument.presentationml.presentation";

#[utoipa::path(
    get,
    path = "/download/{filename}",
    params(
        ("filename" = String, Path, description = "Stored name of a converted file")
    ),
    responses(
        (status = 200, description = "File content as an attachment"),
        (status = 404, description = "Unknown or expired file")
    ),
    tag = "files"
)]
pub async fn download_file(
    State(state): State<crate::AppState>,
    Path(filename): Path<String>,
) -> Result<Response, AppError> {
    let fetched = state.manager.fetch(&filename).await?;
    let (content_type, content_disposition) = resolve_file_headers(&fetched.stored_name);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, content_disposition)
        .header(header::CONTENT_LENGTH, fetched.size)
        .body(Body::from_stream(ReaderStream::new(fetched.file)))
        .map_err(|e| AppError::Internal(format!("Failed to build response: {}", e)))
}

/// Content type by extension and an attachment disposition carrying both an
/// ASCII fallback and the RFC 5987 encoded name.
pub fn resolve_file_headers(filename: &str) -> (String, String) {
    let extension = split_extension(filename).1.trim_start_matches('.').to_lowercase();
    let content_type = match extension.as_str() {
        "pdf" => mime::APPLICATION_PDF.to_string(),
        "pptx" => PPTX_MIME.to_string(),
        "zip" => "application/zip".to_string(),
        _ => mime::APPLICATION_OCTET_STREAM.to_string(),
    };

    let ascii_filename = filename
        .chars()
        .filter(|c| c.is_ascii() && !c.is_control() && *c != '"' && *c != '\\' && *c != ';')
        .collect::<String>();
    let fallback_filename = if ascii_filename.is_empty() {
        "file"
    } else {
        &ascii_filename
    };
    let encoded_filename = utf8_percent_encode(filename, NON_ALPHANUMERIC).to_string();

    let content_disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback_filename, encoded_filename
    );

    (content_type, content_disposition)
}
