use chrono::Utc;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::LifecycleManager;
use crate::models::{ConversionKind, DownloadRef, PendingEntry};
use crate::services::archive::{ArchiveMember, write_archive};
use crate::services::error::{LifecycleError, Result};
use crate::services::registry::LeaseGuard;
use crate::services::slide_deck::SlideDeck;
use crate::utils::naming::{mint_friendly_name, split_extension};

/// Base name for the archive a multi-file batch is packed into
const BATCH_ARCHIVE_BASE: &str = "converted_files";

impl LifecycleManager {
    /// Convert one pending upload and return the stored name of the result.
    ///
    /// The pending entry is leased for the duration, so concurrent calls on
    /// the same name see `NotFound` and the sweep leaves it alone. On success
    /// the input is consumed; on failure the lease is dropped and the upload
    /// stays until it expires. Dropping the future mid-way also gives the
    /// lease back, or retires the input if its output was already stored.
    pub async fn produce(&self, stored_name: &str, kind: ConversionKind) -> Result<String> {
        let (entry, mut lease) = self
            .pools
            .pending
            .lease_guarded(stored_name, Utc::now(), self.config.upload_expiry)
            .ok_or(LifecycleError::NotFound)?;

        match self.run_production(&entry, kind, &mut lease).await {
            Ok(output_name) => {
                self.consume_pending(stored_name, lease).await;
                info!("Produced {} from {} ({})", output_name, stored_name, kind);
                Ok(output_name)
            }
            Err(e) => {
                drop(lease);
                warn!("Production of {} failed: {}", stored_name, e);
                Err(e)
            }
        }
    }

    /// Convert several pending uploads and return one download for all of them.
    ///
    /// Items that fail are skipped. A single success is returned as is; more
    /// are packed into one archive and the individual outputs are dropped.
    pub async fn produce_batch(
        &self,
        stored_names: &[String],
        kind: ConversionKind,
    ) -> Result<DownloadRef> {
        if stored_names.is_empty() {
            return Err(LifecycleError::NoFilesProvided);
        }

        let mut produced = Vec::with_capacity(stored_names.len());
        let mut last_failure = None;
        for name in stored_names {
            match self.produce(name, kind).await {
                Ok(output) => produced.push(output),
                Err(LifecycleError::NotFound) => {
                    warn!("Skipping {}: not pending", name);
                }
                Err(e) => {
                    warn!("Skipping {}: {}", name, e);
                    last_failure = Some(e);
                }
            }
        }

        if produced.is_empty() {
            // Nothing usable; surface the tool's complaint if there was one
            return Err(last_failure.unwrap_or(LifecycleError::NoFilesConverted));
        }
        self.finish_batch(produced).await
    }

    /// Hand back what a batch produced: one output directly, several as an
    /// archive. If the archive cannot be built the first output is returned
    /// and the rest stay registered until they expire.
    async fn finish_batch(&self, mut produced: Vec<String>) -> Result<DownloadRef> {
        if produced.len() == 1 {
            return Ok(DownloadRef {
                stored_name: produced.remove(0),
                is_archive: false,
            });
        }

        match self.package(&produced).await {
            Ok(archive) => Ok(archive),
            Err(e) => {
                error!(
                    "Failed to pack batch outputs, returning {} only (unreturned: {:?}): {}",
                    produced[0],
                    &produced[1..],
                    e
                );
                Ok(DownloadRef {
                    stored_name: produced.remove(0),
                    is_archive: false,
                })
            }
        }
    }

    async fn run_production(
        &self,
        entry: &PendingEntry,
        kind: ConversionKind,
        lease: &mut LeaseGuard<'_>,
    ) -> Result<String> {
        // Fails with NotFound when the entry outlived its file
        self.pools.pending_storage.size(&entry.stored_name).await?;
        let input = self.pools.pending_storage.path_of(&entry.stored_name)?;

        let job = self.pools.output_storage.job_dir()?;
        let produced = match kind {
            ConversionKind::PdfToPptx => {
                let title = split_extension(&entry.original_name).0.to_string();
                self.build_deck(&input, job.path(), title).await?
            }
            ConversionKind::PptxToPdf => self.converter.convert(&input, job.path()).await?,
        };

        let friendly = mint_friendly_name(&entry.original_name, kind.output_extension());
        // Once the output is stored the input must not be produced again
        lease.retire_on_drop();
        let adopted = self.adopt_output(&produced, &friendly).await;
        if adopted.is_err() {
            lease.release_on_drop();
        }
        adopted
    }

    async fn build_deck(&self, pdf: &Path, job_dir: &Path, title: String) -> Result<PathBuf> {
        let pages = self.rasterizer.render_pages(pdf).await?;
        let canvas = self.canvas;
        let dest = job_dir.join("deck.pptx");
        let target = dest.clone();

        tokio::task::spawn_blocking(move || -> Result<()> {
            let deck = SlideDeck::from_pages(canvas, pages)?;
            let file = std::fs::File::create(&target)?;
            let mut writer = deck.write_to(BufWriter::new(file), &title)?;
            writer.flush()?;
            Ok(())
        })
        .await
        .map_err(|e| LifecycleError::Conversion(format!("Deck builder failed: {}", e)))??;

        Ok(dest)
    }

    /// Claim a name in the output pool and move `source` under it. The entry
    /// exists before the file does; until the rename lands it reads as not
    /// found.
    async fn adopt_output(&self, source: &Path, preferred: &str) -> Result<String> {
        let name = self.pools.outputs.register_unique(preferred, Utc::now());
        if let Err(e) = self.pools.output_storage.adopt(source, &name).await {
            self.pools.outputs.remove(&name);
            return Err(e);
        }
        Ok(name)
    }

    /// Delete a produced-from upload, file first. If the file cannot be
    /// deleted the entry is retired so the sweep retries later.
    async fn consume_pending(&self, stored_name: &str, lease: LeaseGuard<'_>) {
        match self.pools.pending_storage.remove(stored_name).await {
            Ok(()) => {
                self.pools.pending.remove(stored_name);
                lease.settle();
            }
            Err(e) => {
                // Dropping the lease retires the entry
                error!("Failed to remove consumed upload {}: {}", stored_name, e);
            }
        }
    }

    async fn package(&self, outputs: &[String]) -> Result<DownloadRef> {
        let members = outputs
            .iter()
            .map(|name| {
                Ok(ArchiveMember {
                    name: name.clone(),
                    path: self.pools.output_storage.path_of(name)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let job = self.pools.output_storage.job_dir()?;
        let dest = job.path().join("bundle.zip");
        let target = dest.clone();
        tokio::task::spawn_blocking(move || write_archive(&members, &target))
            .await
            .map_err(|e| LifecycleError::Conversion(format!("Archive writer failed: {}", e)))??;

        let archive_name = self
            .adopt_output(&dest, &mint_friendly_name(BATCH_ARCHIVE_BASE, ".zip"))
            .await?;

        for name in outputs {
            match self.pools.output_storage.remove(name).await {
                Ok(()) => {
                    self.pools.outputs.remove(name);
                }
                // Left registered; it expires like any other output
                Err(e) => error!("Failed to remove archived output {}: {}", name, e),
            }
        }

        info!("Packed {} outputs into {}", outputs.len(), archive_name);
        Ok(DownloadRef {
            stored_name: archive_name,
            is_archive: true,
        })
    }
}
