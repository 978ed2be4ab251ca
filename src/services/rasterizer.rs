use async_trait::async_trait;
use image::ImageFormat;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, error};

use crate::services::error::{LifecycleError, Result};

/// One rendered PDF page as PNG bytes plus its pixel size.
#[derive(Debug, Clone)]
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub png: Vec<u8>,
}

impl PageImage {
    /// Wrap PNG bytes, reading the dimensions from the header only.
    pub fn from_png(png: Vec<u8>) -> Result<Self> {
        let (width, height) =
            image::io::Reader::with_format(Cursor::new(&png), ImageFormat::Png).into_dimensions()?;
        Ok(Self { width, height, png })
    }
}

/// Turns a PDF into page images, in document order.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn render_pages(&self, pdf_path: &Path) -> Result<Vec<PageImage>>;
}

/// Poppler's `pdftocairo`, writing `page-N.png` files into a scratch directory.
pub struct PdftocairoRasterizer {
    binary: String,
    dpi: u32,
}

impl PdftocairoRasterizer {
    pub fn new(binary: impl Into<String>, dpi: u32) -> Self {
        Self {
            binary: binary.into(),
            dpi,
        }
    }
}

#[async_trait]
impl Rasterizer for PdftocairoRasterizer {
    async fn render_pages(&self, pdf_path: &Path) -> Result<Vec<PageImage>> {
        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(self.dpi.to_string())
            .arg(pdf_path)
            .arg(&prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LifecycleError::ConversionTool {
                status: None,
                detail: format!("failed to run {}: {}", self.binary, e),
            })?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            error!("pdftocairo failed: {}", err_msg);
            return Err(LifecycleError::ConversionTool {
                status: output.status.code(),
                detail: err_msg.trim().to_string(),
            });
        }

        let mut rendered: Vec<(u32, PathBuf)> = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            if let Some(n) = name.to_str().and_then(page_number) {
                rendered.push((n, entry.path()));
            }
        }
        rendered.sort_by_key(|(n, _)| *n);
        debug!("pdftocairo rendered {} pages from {:?}", rendered.len(), pdf_path);

        if rendered.is_empty() {
            return Err(LifecycleError::Conversion(
                "PDF contains no renderable pages".to_string(),
            ));
        }

        let mut pages = Vec::with_capacity(rendered.len());
        for (_, path) in rendered {
            let png = tokio::fs::read(&path).await?;
            pages.push(PageImage::from_png(png)?);
        }
        Ok(pages)
    }
}

/// Page number of a `page-N.png` file; pdftocairo zero-pads N to the width of
/// the page count.
fn page_number(file_name: &str) -> Option<u32> {
    file_name
        .strip_prefix("page-")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_number() {
        assert_eq!(page_number("page-1.png"), Some(1));
        assert_eq!(page_number("page-07.png"), Some(7));
        assert_eq!(page_number("page-120.png"), Some(120));
        assert_eq!(page_number("page-x.png"), None);
        assert_eq!(page_number("other-1.png"), None);
        assert_eq!(page_number("page-1.jpg"), None);
    }

    #[test]
    fn test_page_order_is_numeric() {
        let mut names = vec!["page-10.png", "page-9.png", "page-1.png"];
        names.sort_by_key(|n| page_number(n));
        assert_eq!(names, vec!["page-1.png", "page-9.png", "page-10.png"]);
    }

    #[test]
    fn test_page_image_from_png() {
        let img = image::RgbImage::new(40, 30);
        let mut png = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let page = PageImage::from_png(png).unwrap();
        assert_eq!((page.width, page.height), (40, 30));
    }

    #[test]
    fn test_page_image_rejects_garbage() {
        assert!(PageImage::from_png(b"not a png".to_vec()).is_err());
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_error() {
        let rasterizer = PdftocairoRasterizer::new("definitely-not-a-real-binary-xyz", 72);
        let err = rasterizer
            .render_pages(Path::new("/nonexistent.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::ConversionTool { status: None, .. }));
    }
}
