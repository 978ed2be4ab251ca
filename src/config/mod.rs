use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Lifecycle configuration for the pending and converted pools
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Maximum upload size in bytes (default: 100 MB)
    pub max_upload_size: usize,

    /// Lifetime of an unconverted upload, measured from admission (default: 60s)
    pub upload_expiry: Duration,

    /// Lifetime of a converted file, measured from its last access (default: 300s)
    pub converted_expiry: Duration,

    /// Delay between two reclamation sweeps (default: 30s)
    pub sweep_interval: Duration,

    /// Directory holding pending uploads (default: "uploads")
    pub upload_dir: PathBuf,

    /// Directory holding converted files (default: "converted_files")
    pub converted_dir: PathBuf,

    /// Kill the office converter after this long; `None` waits forever (default: 120s)
    pub conversion_timeout: Option<Duration>,

    /// LibreOffice executable (default: "soffice")
    pub soffice_bin: String,

    /// Poppler rasterizer executable (default: "pdftocairo")
    pub pdftocairo_bin: String,

    /// Resolution used when rasterizing PDF pages (default: 200)
    pub render_dpi: u32,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024, // 100 MB
            upload_expiry: Duration::from_secs(60),
            converted_expiry: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(30),
            upload_dir: PathBuf::from("uploads"),
            converted_dir: PathBuf::from("converted_files"),
            conversion_timeout: Some(Duration::from_secs(120)),
            soffice_bin: "soffice".to_string(),
            pdftocairo_bin: "pdftocairo".to_string(),
            render_dpi: 200,
        }
    }
}

fn env_secs(key: &str) -> Option<Duration> {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl LifecycleConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_upload_size: env::var("MAX_UPLOAD_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_upload_size),

            upload_expiry: env_secs("UPLOAD_EXPIRY_SECS").unwrap_or(default.upload_expiry),

            converted_expiry: env_secs("CONVERTED_EXPIRY_SECS")
                .unwrap_or(default.converted_expiry),

            sweep_interval: env_secs("SWEEP_INTERVAL_SECS").unwrap_or(default.sweep_interval),

            upload_dir: env::var("UPLOAD_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.upload_dir),

            converted_dir: env::var("CONVERTED_FOLDER")
                .map(PathBuf::from)
                .unwrap_or(default.converted_dir),

            // 0 disables the timeout
            conversion_timeout: match env_secs("CONVERSION_TIMEOUT_SECS") {
                Some(d) if d.is_zero() => None,
                Some(d) => Some(d),
                None => default.conversion_timeout,
            },

            soffice_bin: env::var("SOFFICE_BIN").unwrap_or(default.soffice_bin),

            pdftocairo_bin: env::var("PDFTOCAIRO_BIN").unwrap_or(default.pdftocairo_bin),

            render_dpi: env::var("RENDER_DPI")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.render_dpi),
        }
    }

    /// Create config for development (short lifetimes, fast sweeps)
    pub fn development() -> Self {
        Self {
            upload_expiry: Duration::from_secs(30),
            converted_expiry: Duration::from_secs(120),
            sweep_interval: Duration::from_secs(5),
            ..Self::default()
        }
    }

    /// Config rooted in an arbitrary directory, used by tests and embedders
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            upload_dir: root.join("uploads"),
            converted_dir: root.join("converted_files"),
            ..Self::default()
        }
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.upload_expiry >= self.converted_expiry {
            anyhow::bail!(
                "upload expiry ({:?}) must be shorter than converted expiry ({:?})",
                self.upload_expiry,
                self.converted_expiry
            );
        }
        if self.sweep_interval.is_zero() {
            anyhow::bail!("sweep interval must be non-zero");
        }
        if self.upload_dir == self.converted_dir {
            anyhow::bail!("upload and converted folders must differ");
        }
        Ok(())
    }
}
