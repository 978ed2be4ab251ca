use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

use crate::services::error::{LifecycleError, Result};
use crate::utils::validation::validate_file_size;

const CHUNK_SIZE: usize = 64 * 1024;

/// One flat directory of stored files, addressed by stored name.
#[derive(Debug, Clone)]
pub struct PoolStorage {
    root: PathBuf,
}

impl PoolStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Resolve a stored name to its path. Anything that is not a single plain
    /// path component resolves to nothing.
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        let plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if !plain {
            return Err(LifecycleError::NotFound);
        }
        Ok(self.root.join(name))
    }

    /// Stream `reader` into a new file, failing with `TooLarge` once more than
    /// `limit` bytes arrive. Bytes land in a `.part-` file that only takes
    /// `name` once complete, so a write that does not finish leaves nothing
    /// behind.
    pub async fn write_stream<R>(&self, name: &str, mut reader: R, limit: usize) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let dest = self.path_of(name)?;
        let (file, staged) = tempfile::Builder::new()
            .prefix(".part-")
            .tempfile_in(&self.root)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut total: u64 = 0;
        loop {
            let n = reader.read(&mut buffer).await?;
            if n == 0 {
                break;
            }
            total += n as u64;
            validate_file_size(usize::try_from(total).unwrap_or(usize::MAX), limit)?;
            file.write_all(&buffer[..n]).await?;
        }
        file.flush().await?;
        drop(file);

        staged.persist_noclobber(&dest).map_err(|e| e.error)?;
        Ok(total)
    }

    pub async fn write(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.path_of(name)?;
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    pub async fn open(&self, name: &str) -> Result<tokio::fs::File> {
        let path = self.path_of(name)?;
        tokio::fs::File::open(&path).await.map_err(not_found_or_storage)
    }

    pub async fn size(&self, name: &str) -> Result<u64> {
        let path = self.path_of(name)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(not_found_or_storage)?;
        Ok(meta.len())
    }

    pub async fn exists(&self, name: &str) -> bool {
        match self.path_of(name) {
            Ok(path) => tokio::fs::try_exists(path).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Move a file produced elsewhere on the same filesystem into the pool.
    pub async fn adopt(&self, source: &Path, name: &str) -> Result<()> {
        let dest = self.path_of(name)?;
        tokio::fs::rename(source, dest).await?;
        Ok(())
    }

    /// Delete a stored file; a file that is already gone counts as deleted.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Blocking form of [`PoolStorage::remove`], for use under a registry lock.
    pub fn remove_blocking(&self, name: &str) -> std::io::Result<()> {
        let path = self
            .path_of(name)
            .map_err(|_| std::io::Error::new(ErrorKind::InvalidInput, "invalid stored name"))?;
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Scratch directory inside the pool so finished files can be renamed in.
    pub fn job_dir(&self) -> Result<TempDir> {
        let dir = tempfile::Builder::new()
            .prefix(".job-")
            .tempdir_in(&self.root)?;
        Ok(dir)
    }
}

fn not_found_or_storage(e: std::io::Error) -> LifecycleError {
    if e.kind() == ErrorKind::NotFound {
        LifecycleError::NotFound
    } else {
        LifecycleError::Storage(e)
    }
}
