use crate::config::LifecycleConfig;
use crate::services::lifecycle::Pools;
use std::sync::Arc;
use tracing::info;

/// Create both pool directories and empty registries over them.
pub async fn setup_storage(config: &LifecycleConfig) -> anyhow::Result<Arc<Pools>> {
    let pools = Pools::from_config(config);
    pools.pending_storage.ensure_dir().await?;
    pools.output_storage.ensure_dir().await?;

    info!(
        "📁 Pools: uploads={:?} (expire after {:?}), converted={:?} (expire {:?} after last access)",
        pools.pending_storage.root(),
        config.upload_expiry,
        pools.output_storage.root(),
        config.converted_expiry
    );
    Ok(Arc::new(pools))
}
