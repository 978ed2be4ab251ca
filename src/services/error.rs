use thiserror::Error;

pub type Result<T> = std::result::Result<T, LifecycleError>;

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("{0}")]
    InvalidType(String),

    #[error("File size exceeds {}MB", .limit / 1024 / 1024)]
    TooLarge { limit: usize },

    #[error("No file uploaded")]
    NoFile,

    #[error("No files provided")]
    NoFilesProvided,

    #[error("No files converted")]
    NoFilesConverted,

    /// Never existed, expired, or already consumed; callers cannot tell which
    #[error("File not found")]
    NotFound,

    #[error("Conversion tool failed (status {}): {detail}", describe_status(*.status))]
    ConversionTool { status: Option<i32>, detail: String },

    #[error("Conversion failed: {0}")]
    Conversion(String),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),
}

fn describe_status(status: Option<i32>) -> String {
    status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "none".to_string())
}

impl LifecycleError {
    /// Errors caused by the request itself rather than by the system
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LifecycleError::InvalidType(_)
                | LifecycleError::TooLarge { .. }
                | LifecycleError::NoFile
                | LifecycleError::NoFilesProvided
        )
    }
}

impl From<zip::result::ZipError> for LifecycleError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => LifecycleError::Storage(e),
            other => LifecycleError::Conversion(other.to_string()),
        }
    }
}

impl From<image::ImageError> for LifecycleError {
    fn from(err: image::ImageError) -> Self {
        LifecycleError::Conversion(format!("Failed to read page image: {}", err))
    }
}
