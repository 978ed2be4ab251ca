//! File lifecycle: admission into the pending pool, production into the
//! converted pool, renewing access and the background reclaimer.
//!
//! A stored file and its registry entry move together. Uploads are staged
//! under a scratch name and registered once complete. Outputs claim their
//! name first and are renamed in after. Files are deleted before their entry
//! goes. Either way an entry can briefly exist without its file; it reads as
//! not found and expires like any other.

mod admit;
mod fetch;
mod produce;

pub use fetch::FetchedFile;

use std::sync::Arc;

use crate::config::LifecycleConfig;
use crate::services::converter::DocumentConverter;
use crate::services::rasterizer::Rasterizer;
use crate::services::reclaimer::{Reclaimer, ReclaimerHandle};
use crate::services::registry::{OutputRegistry, PendingRegistry};
use crate::services::slide_deck::Canvas;
use crate::services::storage::PoolStorage;

/// Both pools: registry plus backing directory for each.
#[derive(Debug)]
pub struct Pools {
    pub pending: PendingRegistry,
    pub pending_storage: PoolStorage,
    pub outputs: OutputRegistry,
    pub output_storage: PoolStorage,
}

impl Pools {
    pub fn new(pending_storage: PoolStorage, output_storage: PoolStorage) -> Self {
        Self {
            pending: PendingRegistry::new(),
            pending_storage,
            outputs: OutputRegistry::new(),
            output_storage,
        }
    }

    pub fn from_config(config: &LifecycleConfig) -> Self {
        Self::new(
            PoolStorage::new(&config.upload_dir),
            PoolStorage::new(&config.converted_dir),
        )
    }
}

pub struct LifecycleManager {
    config: LifecycleConfig,
    pools: Arc<Pools>,
    rasterizer: Arc<dyn Rasterizer>,
    converter: Arc<dyn DocumentConverter>,
    canvas: Canvas,
}

impl LifecycleManager {
    pub fn new(
        config: LifecycleConfig,
        pools: Arc<Pools>,
        rasterizer: Arc<dyn Rasterizer>,
        converter: Arc<dyn DocumentConverter>,
    ) -> Self {
        Self {
            config,
            pools,
            rasterizer,
            converter,
            canvas: Canvas::STANDARD,
        }
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn pools(&self) -> &Arc<Pools> {
        &self.pools
    }

    /// Spawn the periodic sweep over both pools. The returned handle stops it.
    pub fn start_reclaimer(&self) -> ReclaimerHandle {
        ReclaimerHandle::spawn(Reclaimer::new(self.pools.clone(), &self.config))
    }
}
