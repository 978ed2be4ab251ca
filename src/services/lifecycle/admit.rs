use chrono::Utc;
use tokio::io::AsyncRead;
use tracing::info;

use super::LifecycleManager;
use crate::models::{Admission, ConversionKind, PendingEntry};
use crate::services::error::Result;
use crate::utils::naming::mint_pending_name;
use crate::utils::validation::validate_upload_name;

impl LifecycleManager {
    /// Accept an upload for a later conversion of `kind`.
    ///
    /// The bytes are streamed to disk under a fresh opaque name and the entry
    /// is registered only once the file is complete, so a rejected or
    /// abandoned upload leaves neither behind.
    pub async fn admit<'a>(
        &self,
        reader: impl AsyncRead + Unpin + Send + 'a,
        original_name: &str,
        kind: ConversionKind,
    ) -> Result<Admission> {
        validate_upload_name(original_name, kind)?;

        let stored_name = mint_pending_name(kind.input_extension());
        let size = self
            .pools
            .pending_storage
            .write_stream(&stored_name, reader, self.config.max_upload_size)
            .await?;

        self.pools.pending.put(
            &stored_name,
            PendingEntry::new(stored_name.clone(), original_name.to_string(), Utc::now()),
        );
        info!(
            "Admitted {} as {} ({} bytes, {})",
            original_name, stored_name, size, kind
        );

        Ok(Admission {
            stored_name,
            original_name: original_name.to_string(),
        })
    }
}
