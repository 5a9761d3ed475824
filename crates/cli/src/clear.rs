use smaliscope_core::{EngineConfig, SmaliscopeEngine};
use std::path::PathBuf;
use tracing::info;

pub fn run(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig::from_env();
    if let Some(path) = path {
        let engine = SmaliscopeEngine::builder(path.clone())
            .with_config(config)
            .build();
        info!("Clearing index for project at: {}...", path.display());
        engine.clear()?;
        info!("Project index cleared.");
    } else {
        info!("Clearing all indices at: {}...", config.index_dir.display());
        SmaliscopeEngine::clear_all(&config)?;
        info!("All indices cleared.");
    }
    Ok(())
}
