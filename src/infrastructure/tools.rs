use crate::config::LifecycleConfig;
use crate::services::converter::{DocumentConverter, SofficeConverter};
use crate::services::rasterizer::{PdftocairoRasterizer, Rasterizer};
use std::sync::Arc;
use tracing::info;

pub fn setup_rasterizer(config: &LifecycleConfig) -> Arc<dyn Rasterizer> {
    info!(
        "🖼️  Rasterizer: {} at {} dpi",
        config.pdftocairo_bin, config.render_dpi
    );
    Arc::new(PdftocairoRasterizer::new(
        config.pdftocairo_bin.clone(),
        config.render_dpi,
    ))
}

pub fn setup_converter(config: &LifecycleConfig) -> Arc<dyn DocumentConverter> {
    match config.conversion_timeout {
        Some(limit) => info!("📄 Converter: {} (timeout {:?})", config.soffice_bin, limit),
        None => info!("📄 Converter: {} (no timeout)", config.soffice_bin),
    }
    Arc::new(SofficeConverter::new(
        config.soffice_bin.clone(),
        config.conversion_timeout,
    ))
}
