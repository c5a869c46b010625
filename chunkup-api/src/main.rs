use std::sync::Arc;

use chunkup_api::{setup_router, setup_tracing};
use chunkup_config::Config;
use chunkup_core::{runtime::Runtime, settings::UploadSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;
    setup_tracing(&config.log_level);

    let settings = UploadSettings::try_from(&config)?;
    tracing::info!(
        chunk_root = %settings.chunk_root.display(),
        max_chunk_size = settings.max_chunk_size,
        cleanup_order = %settings.cleanup_order,
        "upload settings loaded"
    );

    let router = setup_router(Arc::new(Runtime::new(settings)));

    let addr = config.bind_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to address {}: {}", addr, e))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .await
        .map_err(|e| anyhow::anyhow!("Server failed: {}", e))?;

    Ok(())
}
