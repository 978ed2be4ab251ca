use crate::models::ConversionKind;
use crate::services::error::{LifecycleError, Result};

/// Validates upload size against the configured ceiling
pub fn validate_file_size(size: usize, max_size: usize) -> Result<()> {
    if size > max_size {
        tracing::warn!(
            "Rejected upload of {} bytes (limit {} bytes)",
            size,
            max_size
        );
        return Err(LifecycleError::TooLarge { limit: max_size });
    }
    Ok(())
}

/// Checks that the client filename carries the extension implied by the
/// conversion direction (case-insensitive).
pub fn validate_upload_name(original_name: &str, kind: ConversionKind) -> Result<()> {
    if original_name.trim().is_empty() {
        return Err(LifecycleError::NoFile);
    }

    if !original_name
        .to_lowercase()
        .ends_with(kind.input_extension())
    {
        let label = match kind {
            ConversionKind::PdfToPptx => "PDF",
            ConversionKind::PptxToPdf => "PPTX",
        };
        return Err(LifecycleError::InvalidType(format!(
            "Only {} files allowed",
            label
        )));
    }

    Ok(())
}
