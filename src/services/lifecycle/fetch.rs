use chrono::Utc;
use tracing::debug;

use super::LifecycleManager;
use crate::services::error::{LifecycleError, Result};

/// An open converted file, ready to stream.
#[derive(Debug)]
pub struct FetchedFile {
    pub stored_name: String,
    pub file: tokio::fs::File,
    pub size: u64,
}

impl LifecycleManager {
    /// Open a converted file for download, renewing its lifetime first.
    ///
    /// The access time is bumped before the file is opened: once the touch
    /// lands the sweep can no longer pick the file, and if the sweep got there
    /// first the entry is already gone and this is a plain not-found.
    pub async fn fetch(&self, stored_name: &str) -> Result<FetchedFile> {
        if !self.pools.outputs.touch(stored_name, Utc::now()) {
            return Err(LifecycleError::NotFound);
        }

        let file = self.pools.output_storage.open(stored_name).await?;
        let size = file.metadata().await?.len();
        debug!("Serving {} ({} bytes)", stored_name, size);

        Ok(FetchedFile {
            stored_name: stored_name.to_string(),
            file,
            size,
        })
    }
}
