use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{IndexStats, SmaliscopeEngine};
use crate::error::Result;
use smaliscope_api::models::{SymbolInfo, SymbolLocation};
use smaliscope_smali::Declaration;
use tokio::task::JoinHandle;

mod semantic;

/// Engine handle: the interface clients program against.
///
/// Implements the api traits ([`smaliscope_api::SymbolLookup`],
/// [`smaliscope_api::SymbolNavigator`]) over one project engine.
#[derive(Clone)]
pub struct EngineHandle {
    pub(crate) engine: Arc<SmaliscopeEngine>,
}

impl EngineHandle {
    /// Build an engine for `project_root` with the default configuration.
    /// Call [`EngineHandle::open`] to index it.
    pub fn new(project_root: PathBuf) -> Self {
        Self {
            engine: Arc::new(SmaliscopeEngine::builder(project_root).build()),
        }
    }

    pub fn from_engine(engine: Arc<SmaliscopeEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<SmaliscopeEngine> {
        &self.engine
    }

    pub fn open(&self) -> Result<IndexStats> {
        self.engine.open()
    }

    pub fn refresh(&self) -> Result<IndexStats> {
        self.engine.refresh()
    }

    /// Watch for filesystem changes until the engine is dropped.
    pub async fn watch(&self) -> Result<JoinHandle<()>> {
        self.engine.clone().watch().await
    }

    pub(crate) fn location_of(&self, decl: &Declaration) -> Option<SymbolLocation> {
        let path = self.engine.files().path(decl.file())?;
        Some(SymbolLocation {
            path,
            range: decl.range(),
            fqn: decl.qualified_name(),
        })
    }

    pub(crate) fn info_of(&self, decl: &Declaration) -> Option<SymbolInfo> {
        Some(SymbolInfo {
            name: decl.name().to_string(),
            kind: decl.kind(),
            signature: decl.signature(),
            location: self.location_of(decl)?,
        })
    }
}
