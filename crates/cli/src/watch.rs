use smaliscope_core::SmaliscopeEngine;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

pub async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let engine = Arc::new(SmaliscopeEngine::builder(path.clone()).build());

    info!("Initializing: Indexing project at: {}...", path.display());
    let indexer = Arc::clone(&engine);
    let stats = tokio::task::spawn_blocking(move || indexer.open()).await??;
    info!("Initial indexing complete: {}", stats);

    let task = Arc::clone(&engine).watch().await?;
    info!("File watcher started. Ready for changes.");
    info!("Press Ctrl+C to stop.");

    tokio::signal::ctrl_c().await?;
    engine.cancel_token().cancel();
    task.await?;
    info!("Watcher stopped.");

    Ok(())
}
