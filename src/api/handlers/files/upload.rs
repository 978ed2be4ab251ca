use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartError},
};
use futures::TryStreamExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeekExt};
use tokio_util::io::StreamReader;

use super::types::*;
use crate::api::error::AppError;
use crate::models::{Admission, ConversionKind};
use crate::services::error::LifecycleError;

/// The file part, either already admitted or parked until the conversion type
/// shows up later in the form.
enum ReceivedFile {
    Admitted(Admission),
    Spooled {
        original_name: String,
        file: tokio::fs::File,
    },
}

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = String, description = "Multipart form with `file` and `conversion_type`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Upload accepted", body = UploadResponse),
        (status = 400, description = "Missing file, invalid conversion type or wrong extension"),
        (status = 413, description = "File exceeds the upload ceiling")
    ),
    tag = "files"
)]
pub async fn upload_file(
    State(state): State<crate::AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let mut conversion_type: Option<String> = None;
    let mut received: Option<ReceivedFile> = None;

    let result: Result<Json<UploadResponse>, AppError> = async {
        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();

            if name == "conversion_type" {
                conversion_type = Some(field.text().await.map_err(multipart_error)?);
            } else if name == "file" && received.is_none() {
                let original_name = field.file_name().unwrap_or_default().to_string();
                if original_name.is_empty() {
                    return Err(LifecycleError::NoFile.into());
                }

                let reader = StreamReader::new(field.map_err(std::io::Error::other));
                received = Some(match conversion_type.as_deref() {
                    Some(raw) => {
                        let kind: ConversionKind = raw.parse()?;
                        ReceivedFile::Admitted(
                            state.manager.admit(reader, &original_name, kind).await?,
                        )
                    }
                    None => ReceivedFile::Spooled {
                        original_name,
                        file: spool(reader, state.config.max_upload_size).await?,
                    },
                });
            }
        }

        let admission = match received.take() {
            None => return Err(LifecycleError::NoFile.into()),
            Some(ReceivedFile::Admitted(admission)) => admission,
            Some(ReceivedFile::Spooled {
                original_name,
                file,
            }) => {
                let kind: ConversionKind = conversion_type.as_deref().unwrap_or_default().parse()?;
                state.manager.admit(file, &original_name, kind).await?
            }
        };

        Ok(Json(admission.into()))
    }
    .await;

    match result {
        Ok(res) => Ok(res),
        Err(e) => {
            // Drain the rest of the body so the client sees the error instead of a reset
            tracing::warn!("Upload rejected: {}. Consuming remaining stream...", e);
            while let Ok(Some(mut field)) = multipart.next_field().await {
                while let Ok(Some(_)) = field.chunk().await {}
            }
            Err(e)
        }
    }
}

fn multipart_error(e: MultipartError) -> AppError {
    let err_msg = e.to_string();
    if err_msg.contains("length limit exceeded") {
        AppError::PayloadTooLarge("Request body exceeds the maximum allowed limit".to_string())
    } else {
        AppError::BadRequest(err_msg)
    }
}

/// Copy the file part to an anonymous temp file, keeping at most one byte past
/// `limit` so admission can still report it as too large.
async fn spool(reader: impl AsyncRead + Unpin, limit: usize) -> Result<tokio::fs::File, AppError> {
    let internal = |e: std::io::Error| AppError::Internal(format!("Failed to spool upload: {}", e));

    let mut file = tokio::fs::File::from_std(tempfile::tempfile().map_err(internal)?);
    let mut limited = reader.take((limit as u64).saturating_add(1));
    tokio::io::copy(&mut limited, &mut file)
        .await
        .map_err(internal)?;
    file.rewind().await.map_err(internal)?;
    Ok(file)
}
