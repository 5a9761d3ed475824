use smaliscope_core::SmaliscopeEngine;
use std::path::PathBuf;
use tracing::info;

pub fn run(path: PathBuf, rebuild: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = SmaliscopeEngine::builder(path.clone()).build();

    info!("Indexing project at: {}...", path.display());
    let stats = if rebuild {
        engine.rebuild()?
    } else {
        engine.open()?
    };

    info!("Indexing complete!");
    info!("Files: {}", engine.files().len());
    info!("Classes: {}", stats.classes);
    info!(
        "Parsed: {}, restored: {}, unchanged: {}",
        stats.parsed, stats.restored, stats.unchanged
    );

    info!("Sample classes:");
    for name in engine.index().qualified_names().iter().take(10) {
        info!(" - {}", name);
    }

    Ok(())
}
