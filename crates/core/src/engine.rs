//! Project engine: owns the file set, the symbol index and the stub store.
//!
//! All updates go through one mutex, so there is a single writer; readers
//! take [`Resolver`]s over the index at any time and see each file either
//! before or after an update, never half-applied.

use crate::config::EngineConfig;
use crate::error::Result;
use crate::files::FileSet;
use crate::scanner::{ScannedFile, Scanner, decode_content};
use crate::store::{STORE_VERSION, StoreFile, StoredFile, StubStore};
use indexmap::IndexMap;
use rayon::prelude::*;
use smaliscope_smali::{
    ClassStub, ProjectSymbolIndex, Resolver, SourceLoader, SyntaxNode, parse,
};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What an update did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    /// Files parsed from source.
    pub parsed: usize,
    /// Files restored from the stub store without parsing.
    pub restored: usize,
    /// Files whose content hash had not changed.
    pub unchanged: usize,
    pub removed: usize,
    /// Class entries in the index afterwards.
    pub classes: usize,
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} parsed, {} restored, {} unchanged, {} removed ({} classes)",
            self.parsed, self.restored, self.unchanged, self.removed, self.classes
        )
    }
}

pub struct SmaliscopeEngine {
    root: PathBuf,
    config: EngineConfig,
    files: Arc<FileSet>,
    index: Arc<ProjectSymbolIndex>,
    store: StubStore,
    /// Last committed state per path. Its lock serializes updates.
    records: Mutex<IndexMap<PathBuf, StoredFile>>,
    cancel_token: CancellationToken,
}

pub struct SmaliscopeEngineBuilder {
    root: PathBuf,
    config: EngineConfig,
}

impl SmaliscopeEngineBuilder {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_index_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.index_dir = dir.into();
        self
    }

    pub fn with_persist(mut self, persist: bool) -> Self {
        self.config.persist = persist;
        self
    }

    pub fn with_debounce(mut self, debounce: std::time::Duration) -> Self {
        self.config.debounce = debounce;
        self
    }

    pub fn build(self) -> SmaliscopeEngine {
        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        let files = Arc::new(FileSet::new());
        let loader: Arc<dyn SourceLoader> = files.clone();

        SmaliscopeEngine {
            store: StubStore::for_project(&self.config.index_dir, &root),
            index: Arc::new(ProjectSymbolIndex::with_loader(loader)),
            files,
            root,
            config: self.config,
            records: Mutex::new(IndexMap::new()),
            cancel_token: CancellationToken::new(),
        }
    }
}

impl Drop for SmaliscopeEngine {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl SmaliscopeEngine {
    pub fn builder(root: PathBuf) -> SmaliscopeEngineBuilder {
        SmaliscopeEngineBuilder::new(root)
    }

    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<ProjectSymbolIndex> {
        &self.index
    }

    pub fn files(&self) -> &Arc<FileSet> {
        &self.files
    }

    pub fn store_path(&self) -> &Path {
        self.store.path()
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }

    /// A resolver over the current index state.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.index)
    }

    /// Parse the current on-disk content of `path`.
    pub fn parse_file(&self, path: &Path) -> Result<SyntaxNode> {
        let bytes = std::fs::read(path)?;
        Ok(parse(&decode_content(path, bytes)))
    }

    fn lock_records(&self) -> MutexGuard<'_, IndexMap<PathBuf, StoredFile>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index the project, restoring unchanged files from the stub store.
    pub fn open(&self) -> Result<IndexStats> {
        let mut records = self.lock_records();
        let restore = self.store.load()?;
        let paths = self.project_paths(&records);
        let stats = self.apply(&mut records, paths, restore.as_ref())?;
        self.persist(&records)?;
        info!("Opened {}: {}", self.root.display(), stats);
        Ok(stats)
    }

    /// Pick up every change on disk since the last update.
    pub fn refresh(&self) -> Result<IndexStats> {
        let mut records = self.lock_records();
        let paths = self.project_paths(&records);
        let stats = self.apply(&mut records, paths, None)?;
        self.persist(&records)?;
        info!("Refreshed {}: {}", self.root.display(), stats);
        Ok(stats)
    }

    /// Drop everything and parse the whole project again.
    pub fn rebuild(&self) -> Result<IndexStats> {
        let mut records = self.lock_records();
        let known: Vec<PathBuf> = records.keys().cloned().collect();
        for path in &known {
            self.detach(&mut records, path);
        }
        let paths = Scanner::collect_paths(&self.root);
        let stats = self.apply(&mut records, paths, None)?;
        self.persist(&records)?;
        info!("Rebuilt {}: {}", self.root.display(), stats);
        Ok(stats)
    }

    /// Reindex `paths`. Paths that no longer exist are removed.
    pub fn update_files(&self, paths: Vec<PathBuf>) -> Result<IndexStats> {
        let mut records = self.lock_records();
        let stats = self.apply(&mut records, paths, None)?;
        if stats.parsed + stats.removed > 0 {
            self.persist(&records)?;
        }
        debug!("Updated files: {}", stats);
        Ok(stats)
    }

    pub fn remove_files(&self, paths: &[PathBuf]) -> Result<IndexStats> {
        let mut records = self.lock_records();
        let mut stats = IndexStats::default();
        for path in paths {
            if self.detach(&mut records, path) {
                stats.removed += 1;
            }
        }
        stats.classes = self.index.len();
        if stats.removed > 0 {
            self.persist(&records)?;
        }
        Ok(stats)
    }

    /// Delete this project's stub store and empty the index.
    pub fn clear(&self) -> Result<()> {
        let mut records = self.lock_records();
        let known: Vec<PathBuf> = records.keys().cloned().collect();
        for path in &known {
            self.detach(&mut records, path);
        }
        self.store.clear()?;
        info!("Cleared index for {}", self.root.display());
        Ok(())
    }

    /// Delete every project's stub store under the configured index dir.
    pub fn clear_all(config: &EngineConfig) -> Result<()> {
        if config.index_dir.exists() {
            std::fs::remove_dir_all(&config.index_dir)?;
        }
        Ok(())
    }

    /// Files on disk plus known files that have disappeared.
    fn project_paths(&self, records: &IndexMap<PathBuf, StoredFile>) -> Vec<PathBuf> {
        let mut paths = Scanner::collect_paths(&self.root);
        paths.extend(records.keys().filter(|p| !p.exists()).cloned());
        paths
    }

    fn apply(
        &self,
        records: &mut IndexMap<PathBuf, StoredFile>,
        mut paths: Vec<PathBuf>,
        restore: Option<&StoreFile>,
    ) -> Result<IndexStats> {
        let mut stats = IndexStats::default();

        paths.sort();
        paths.dedup();
        let (present, gone): (Vec<_>, Vec<_>) = paths.into_iter().partition(|p| p.is_file());
        for path in &gone {
            if self.detach(records, path) {
                stats.removed += 1;
            }
        }
        // ids follow path order so first-match resolution is reproducible
        for path in &present {
            self.files.intern(path);
        }

        let scanned = Scanner::read_files(&present);
        if scanned.len() < present.len() {
            // entries of unreadable files are dropped
            let read: HashSet<&Path> = scanned.iter().map(|f| f.path.as_path()).collect();
            for path in present.iter().filter(|p| !read.contains(p.as_path())) {
                if self.detach(records, path) {
                    stats.removed += 1;
                }
            }
        }

        let changed: Vec<ScannedFile> = scanned
            .into_iter()
            .filter(|file| {
                let same = records
                    .get(&file.path)
                    .is_some_and(|r| r.content_hash == file.content_hash);
                if same {
                    stats.unchanged += 1;
                }
                !same
            })
            .collect();

        let mut to_parse = Vec::new();
        for file in changed {
            match restore.and_then(|store| Self::restorable(store, &file)) {
                Some((stored, stubs)) => {
                    let id = self.files.intern(&file.path);
                    self.index.index_stubs(id, file.content_hash, stubs);
                    records.insert(file.path, stored);
                    stats.restored += 1;
                }
                None => to_parse.push(file),
            }
        }

        let parsed: Vec<(ScannedFile, SyntaxNode)> = to_parse
            .into_par_iter()
            .map(|file| {
                let tree = parse(&file.content);
                (file, tree)
            })
            .collect();

        for (file, tree) in parsed {
            let id = self.files.intern(&file.path);
            self.index.index_file(id, &tree);
            let stubs: Vec<ClassStub> = self
                .index
                .file_entries(id)
                .iter()
                .map(|h| h.stub().clone())
                .collect();
            records.insert(file.path, StoredFile::new(file.content_hash, &stubs)?);
            stats.parsed += 1;
        }

        stats.classes = self.index.len();
        Ok(stats)
    }

    fn restorable(store: &StoreFile, file: &ScannedFile) -> Option<(StoredFile, Vec<ClassStub>)> {
        let stored = store.files.get(&file.path)?;
        if stored.content_hash != file.content_hash {
            return None;
        }
        match stored.decode() {
            Ok(stubs) => Some((stored.clone(), stubs)),
            Err(e) => {
                warn!("Discarding stored stubs for {}: {}", file.path.display(), e);
                None
            }
        }
    }

    fn detach(&self, records: &mut IndexMap<PathBuf, StoredFile>, path: &Path) -> bool {
        let known = records.shift_remove(path).is_some();
        if let Some(id) = self.files.remove(path) {
            self.index.remove_file(id);
        }
        known
    }

    fn persist(&self, records: &IndexMap<PathBuf, StoredFile>) -> Result<()> {
        if !self.config.persist {
            return Ok(());
        }
        let store = StoreFile {
            version: STORE_VERSION,
            root: self.root.to_string_lossy().into_owned(),
            files: records.clone(),
        };
        self.store.save(&store)
    }
}
