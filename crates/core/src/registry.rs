use crate::config::EngineConfig;
use crate::engine::SmaliscopeEngine;
use crate::error::Result;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Open engines keyed by canonical project root.
pub struct ProjectRegistry {
    config: EngineConfig,
    engines: DashMap<PathBuf, Arc<SmaliscopeEngine>>,
}

impl ProjectRegistry {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engines: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine for `root`, indexing the project on first open.
    pub fn open(&self, root: &Path) -> Result<Arc<SmaliscopeEngine>> {
        let root = root.canonicalize()?;
        if let Some(engine) = self.engines.get(&root) {
            return Ok(engine.clone());
        }

        let engine = Arc::new(
            SmaliscopeEngine::builder(root.clone())
                .with_config(self.config.clone())
                .build(),
        );
        engine.open()?;

        // a concurrent open of the same root may have won the race
        let engine = self.engines.entry(root).or_insert(engine).clone();
        Ok(engine)
    }

    pub fn get(&self, root: &Path) -> Option<Arc<SmaliscopeEngine>> {
        let root = root.canonicalize().ok()?;
        self.engines.get(&root).map(|e| e.clone())
    }

    /// Stop the engine's background work and forget it.
    pub fn close(&self, root: &Path) -> bool {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        match self.engines.remove(&root) {
            Some((_, engine)) => {
                engine.cancel_token().cancel();
                info!("Closed project {}", root.display());
                true
            }
            None => false,
        }
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        let mut roots: Vec<PathBuf> = self.engines.iter().map(|e| e.key().clone()).collect();
        roots.sort();
        roots
    }

    pub fn len(&self) -> usize {
        self.engines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}
