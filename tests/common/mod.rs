#![allow(dead_code)]

use async_trait::async_trait;
use ephemeral_convert::config::LifecycleConfig;
use ephemeral_convert::infrastructure::storage::setup_storage;
use ephemeral_convert::services::converter::{DocumentConverter, expected_output};
use ephemeral_convert::services::error::{LifecycleError, Result};
use ephemeral_convert::services::lifecycle::LifecycleManager;
use ephemeral_convert::services::rasterizer::{PageImage, Rasterizer};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, ReadBuf};

pub const FAKE_PDF: &[u8] = b"%PDF-1.4 fake";

pub fn png_page(width: u32, height: u32) -> PageImage {
    let mut png = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(width, height))
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .unwrap();
    PageImage::from_png(png).unwrap()
}

/// Returns the same page sizes for every PDF.
pub struct FakeRasterizer {
    pub pages: Vec<(u32, u32)>,
}

#[async_trait]
impl Rasterizer for FakeRasterizer {
    async fn render_pages(&self, pdf_path: &Path) -> Result<Vec<PageImage>> {
        assert!(pdf_path.exists(), "rasterizer called on a missing input");
        Ok(self.pages.iter().map(|(w, h)| png_page(*w, *h)).collect())
    }
}

/// Writes `<stem>.pdf` like the real tool, optionally after a delay.
pub struct FakeConverter {
    pub delay: Option<Duration>,
}

#[async_trait]
impl DocumentConverter for FakeConverter {
    async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let out = expected_output(input, output_dir)?;
        tokio::fs::write(&out, FAKE_PDF).await?;
        Ok(out)
    }
}

pub struct FailingConverter;

#[async_trait]
impl DocumentConverter for FailingConverter {
    async fn convert(&self, _input: &Path, _output_dir: &Path) -> Result<PathBuf> {
        Err(LifecycleError::ConversionTool {
            status: Some(1),
            detail: "source file could not be loaded".to_string(),
        })
    }
}

/// Sends a few bytes, then never makes progress again.
#[derive(Default)]
pub struct StalledReader {
    sent: bool,
}

impl AsyncRead for StalledReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.sent {
            return Poll::Pending;
        }
        self.sent = true;
        buf.put_slice(b"%PDF-1.4 partial");
        Poll::Ready(Ok(()))
    }
}

pub struct TestEnv {
    pub dir: TempDir,
    pub config: LifecycleConfig,
    pub manager: Arc<LifecycleManager>,
}

pub async fn setup_with(
    config_fn: impl FnOnce(&mut LifecycleConfig),
    converter: Arc<dyn DocumentConverter>,
) -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let mut config = LifecycleConfig::with_root(dir.path());
    config_fn(&mut config);

    let pools = setup_storage(&config).await.unwrap();
    let manager = Arc::new(LifecycleManager::new(
        config.clone(),
        pools,
        Arc::new(FakeRasterizer {
            pages: vec![(1000, 750)],
        }),
        converter,
    ));
    TestEnv {
        dir,
        config,
        manager,
    }
}

pub async fn setup() -> TestEnv {
    setup_with(|_| {}, Arc::new(FakeConverter { delay: None })).await
}

/// Regular files in a pool directory, ignoring scratch job directories.
pub fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}
