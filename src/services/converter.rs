use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{error, info};

use crate::services::error::{LifecycleError, Result};

const TARGET_FORMAT: &str = "pdf";

/// Converts a slide deck to PDF.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// Convert `input`, writing the result into `output_dir`, and return the
    /// path of the produced file.
    async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf>;
}

/// LibreOffice in headless mode. The tool names its output after the input's
/// base name, so `abc.pptx` becomes `<output_dir>/abc.pdf`.
pub struct SofficeConverter {
    binary: String,
    timeout: Option<Duration>,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

/// Where the tool is expected to leave its output for `input`.
pub fn expected_output(input: &Path, output_dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| LifecycleError::Conversion(format!("Bad input path {:?}", input)))?;
    Ok(output_dir.join(format!("{}.{}", stem, TARGET_FORMAT)))
}

#[async_trait]
impl DocumentConverter for SofficeConverter {
    async fn convert(&self, input: &Path, output_dir: &Path) -> Result<PathBuf> {
        let mut command = Command::new(&self.binary);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg(TARGET_FORMAT)
            .arg(input)
            .arg("--outdir")
            .arg(output_dir)
            .kill_on_drop(true);

        info!("Running {} on {:?}", self.binary, input);
        let run = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run).await.map_err(|_| {
                error!("{} timed out after {:?} on {:?}", self.binary, limit, input);
                LifecycleError::ConversionTool {
                    status: None,
                    detail: format!("timed out after {}s", limit.as_secs()),
                }
            })?,
            None => run.await,
        }
        .map_err(|e| LifecycleError::ConversionTool {
            status: None,
            detail: format!("failed to run {}: {}", self.binary, e),
        })?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            error!("{} failed ({}): {}", self.binary, output.status, err_msg);
            return Err(LifecycleError::ConversionTool {
                status: output.status.code(),
                detail: err_msg.trim().to_string(),
            });
        }

        let produced = expected_output(input, output_dir)?;
        if !tokio::fs::try_exists(&produced).await.unwrap_or(false) {
            return Err(LifecycleError::ConversionTool {
                status: output.status.code(),
                detail: format!("no output written to {:?}", produced),
            });
        }
        Ok(produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_output() {
        let out = expected_output(
            Path::new("/srv/uploads/0b6f.pptx"),
            Path::new("/srv/converted/.job-1"),
        )
        .unwrap();
        assert_eq!(out, PathBuf::from("/srv/converted/.job-1/0b6f.pdf"));
    }

    #[cfg(unix)]
    fn script(dir: &Path, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join("fake-soffice");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_convert_with_fake_tool() {
        let dir = tempfile::tempdir().unwrap();
        // $4 = input, $6 = output dir
        let bin = script(
            dir.path(),
            r#"base=$(basename "$4"); printf '%%PDF-1.4' > "$6/${base%.*}.pdf""#,
        );
        let input = dir.path().join("abc.pptx");
        std::fs::write(&input, b"pptx").unwrap();
        let out_dir = dir.path().join("out");
        std::fs::create_dir(&out_dir).unwrap();

        let converter = SofficeConverter::new(bin, Some(Duration::from_secs(10)));
        let produced = converter.convert(&input, &out_dir).await.unwrap();
        assert_eq!(produced, out_dir.join("abc.pdf"));
        assert_eq!(std::fs::read(produced).unwrap(), b"%PDF-1.4");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_status() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "echo boom >&2; exit 3");
        let converter = SofficeConverter::new(bin, None);

        let err = converter
            .convert(&dir.path().join("x.pptx"), dir.path())
            .await
            .unwrap_err();
        match err {
            LifecycleError::ConversionTool { status, detail } => {
                assert_eq!(status, Some(3));
                assert_eq!(detail, "boom");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_tool() {
        let dir = tempfile::tempdir().unwrap();
        let bin = script(dir.path(), "sleep 30");
        let converter = SofficeConverter::new(bin, Some(Duration::from_millis(200)));

        let err = converter
            .convert(&dir.path().join("x.pptx"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::ConversionTool { status: None, .. }));
    }
}
