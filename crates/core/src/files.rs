use crate::scanner::{content_hash, decode_content};
use dashmap::DashMap;
use smaliscope_api::models::FileId;
use smaliscope_smali::{SourceLoader, SyntaxNode, parse};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

/// Path to `FileId` mapping for one project.
///
/// Ids are handed out in increasing order and never reused, so a stale id
/// can never alias a newer file.
#[derive(Debug, Default)]
pub struct FileSet {
    ids: DashMap<PathBuf, FileId>,
    paths: DashMap<FileId, PathBuf>,
    next_id: AtomicU32,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `path`, assigning a fresh one on first sight.
    pub fn intern(&self, path: &Path) -> FileId {
        if let Some(id) = self.ids.get(path) {
            return *id;
        }
        *self.ids.entry(path.to_path_buf()).or_insert_with(|| {
            let id = FileId(self.next_id.fetch_add(1, Ordering::Relaxed));
            self.paths.insert(id, path.to_path_buf());
            id
        })
    }

    pub fn get(&self, path: &Path) -> Option<FileId> {
        self.ids.get(path).map(|id| *id)
    }

    pub fn path(&self, file: FileId) -> Option<PathBuf> {
        self.paths.get(&file).map(|p| p.clone())
    }

    /// Forget `path`. Its id is retired.
    pub fn remove(&self, path: &Path) -> Option<FileId> {
        let (_, id) = self.ids.remove(path)?;
        self.paths.remove(&id);
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

impl SourceLoader for FileSet {
    fn load(&self, file: FileId, expected_hash: u64) -> Option<SyntaxNode> {
        let path = self.path(file)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("Cannot reload {}: {}", path.display(), err);
                return None;
            }
        };
        if content_hash(&bytes) != expected_hash {
            debug!("{} changed since it was indexed", path.display());
            return None;
        }
        Some(parse(&decode_content(&path, bytes)))
    }
}
