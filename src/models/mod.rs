use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::services::error::LifecycleError;

/// Direction of a conversion job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    PdfToPptx,
    PptxToPdf,
}

impl ConversionKind {
    /// Extension an upload must carry to be admitted for this kind
    pub fn input_extension(self) -> &'static str {
        match self {
            ConversionKind::PdfToPptx => ".pdf",
            ConversionKind::PptxToPdf => ".pptx",
        }
    }

    pub fn output_extension(self) -> &'static str {
        match self {
            ConversionKind::PdfToPptx => ".pptx",
            ConversionKind::PptxToPdf => ".pdf",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConversionKind::PdfToPptx => "pdf_to_pptx",
            ConversionKind::PptxToPdf => "pptx_to_pdf",
        }
    }
}

impl fmt::Display for ConversionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversionKind {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pdf_to_pptx" => Ok(ConversionKind::PdfToPptx),
            "pptx_to_pdf" => Ok(ConversionKind::PptxToPdf),
            _ => Err(LifecycleError::InvalidType(
                "Invalid conversion type".to_string(),
            )),
        }
    }
}

/// Metadata for an uploaded file awaiting conversion
#[derive(Debug, Clone)]
pub struct PendingEntry {
    pub stored_name: String,
    pub upload_timestamp: DateTime<Utc>,
    pub original_name: String,
    /// Set while a production holds the entry; the sweep leaves leased entries alone
    pub(crate) leased: bool,
}

impl PendingEntry {
    pub fn new(stored_name: String, original_name: String, upload_timestamp: DateTime<Utc>) -> Self {
        Self {
            stored_name,
            upload_timestamp,
            original_name,
            leased: false,
        }
    }

    pub fn is_leased(&self) -> bool {
        self.leased
    }
}

/// Metadata for a produced, downloadable file
#[derive(Debug, Clone)]
pub struct OutputEntry {
    pub stored_name: String,
    pub last_access_timestamp: DateTime<Utc>,
}

impl OutputEntry {
    pub fn new(stored_name: String, last_access_timestamp: DateTime<Utc>) -> Self {
        Self {
            stored_name,
            last_access_timestamp,
        }
    }
}

/// Result of admitting an upload into the pending pool
#[derive(Debug, Clone)]
pub struct Admission {
    pub stored_name: String,
    pub original_name: String,
}

/// Addressable result of a batch production
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRef {
    pub stored_name: String,
    pub is_archive: bool,
}

impl DownloadRef {
    pub fn url(&self) -> String {
        format!("/download/{}", self.stored_name)
    }
}
