//! Project-wide qualified name index.
//!
//! Maps dotted class names to every declaration of that name across the
//! committed files of a project. Updates replace a whole file's entries
//! under one write lock, so readers observe either the old or the new set
//! for that file, never a mix.

mod handle;

pub use handle::{ClassHandle, SourceLoader};

use crate::model::ClassDecl;
use crate::stub::ClassStub;
use crate::syntax::{SyntaxKind, SyntaxNode};
use lasso::{Spur, ThreadedRodeo};
use smaliscope_api::models::FileId;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};
use tracing::debug;

#[derive(Default)]
struct IndexState {
    /// Candidates per name, kept sorted by `(file, ordinal)`.
    by_name: HashMap<Spur, Vec<Arc<ClassHandle>>>,
    by_file: BTreeMap<FileId, Vec<Arc<ClassHandle>>>,
    entries: usize,
    revision: u64,
}

pub struct ProjectSymbolIndex {
    state: RwLock<IndexState>,
    names: ThreadedRodeo,
    loader: Option<Arc<dyn SourceLoader>>,
}

impl Default for ProjectSymbolIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ProjectSymbolIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            names: ThreadedRodeo::new(),
            loader: None,
        }
    }

    /// An index whose stub-restored entries materialize through `loader`.
    pub fn with_loader(loader: Arc<dyn SourceLoader>) -> Self {
        Self {
            loader: Some(loader),
            ..Self::new()
        }
    }

    /// Replace the entries of `file` with the class declarations of `tree`.
    ///
    /// Classes without a usable name are skipped; the rest of the file still
    /// indexes. Returns the number of entries now held for the file.
    pub fn index_file(&self, file: FileId, tree: &SyntaxNode) -> usize {
        let handles: Vec<_> = tree
            .children_of_kind(SyntaxKind::Class)
            .filter_map(ClassDecl::from_syntax)
            .enumerate()
            .map(|(ordinal, decl)| Arc::new(ClassHandle::materialized(file, ordinal as u32, decl)))
            .collect();
        self.replace(file, handles)
    }

    /// Replace the entries of `file` with lazily materialized stub entries.
    ///
    /// `content_hash` identifies the content the stubs were built from; an
    /// entry only materializes from source while the file still matches it.
    pub fn index_stubs(&self, file: FileId, content_hash: u64, stubs: Vec<ClassStub>) -> usize {
        let handles: Vec<_> = stubs
            .into_iter()
            .enumerate()
            .map(|(ordinal, stub)| {
                Arc::new(ClassHandle::from_stub(
                    file,
                    ordinal as u32,
                    stub,
                    content_hash,
                    self.loader.clone(),
                ))
            })
            .collect();
        self.replace(file, handles)
    }

    /// Drop every entry of `file`. Returns whether the file was indexed.
    pub fn remove_file(&self, file: FileId) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let removed = Self::detach(&mut state, &self.names, file);
        if removed {
            state.revision += 1;
            debug!(%file, "removed from index");
        }
        removed
    }

    fn replace(&self, file: FileId, handles: Vec<Arc<ClassHandle>>) -> usize {
        // intern outside the write section
        let keys: Vec<Spur> = handles
            .iter()
            .map(|h| self.names.get_or_intern(h.qualified_name()))
            .collect();
        let count = handles.len();

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        Self::detach(&mut state, &self.names, file);
        for (key, handle) in keys.into_iter().zip(&handles) {
            let candidates = state.by_name.entry(key).or_default();
            let pos = candidates
                .partition_point(|c| (c.file(), c.ordinal()) < (handle.file(), handle.ordinal()));
            candidates.insert(pos, Arc::clone(handle));
        }
        if !handles.is_empty() {
            state.entries += count;
            state.by_file.insert(file, handles);
        }
        state.revision += 1;
        drop(state);

        debug!(%file, classes = count, "indexed file");
        count
    }

    fn detach(state: &mut IndexState, names: &ThreadedRodeo, file: FileId) -> bool {
        let Some(old) = state.by_file.remove(&file) else {
            return false;
        };
        state.entries -= old.len();
        for handle in &old {
            let Some(key) = names.get(handle.qualified_name()) else {
                continue;
            };
            if let Some(candidates) = state.by_name.get_mut(&key) {
                candidates.retain(|c| c.file() != file);
                if candidates.is_empty() {
                    state.by_name.remove(&key);
                }
            }
        }
        true
    }

    /// A consistent read view for a sequence of lookups.
    pub fn read(&self) -> IndexView<'_> {
        IndexView {
            state: self.state.read().unwrap_or_else(PoisonError::into_inner),
            names: &self.names,
        }
    }

    /// Every declaration named `qualified_name`, ordered by `(file, ordinal)`.
    pub fn lookup_by_qualified_name(&self, qualified_name: &str) -> Vec<Arc<ClassHandle>> {
        self.read().lookup(qualified_name).to_vec()
    }

    /// First match wins: the candidate from the lowest file id, then the
    /// earliest declaration in that file.
    pub fn first_by_qualified_name(&self, qualified_name: &str) -> Option<Arc<ClassHandle>> {
        self.read().first(qualified_name).cloned()
    }

    pub fn file_entries(&self, file: FileId) -> Vec<Arc<ClassHandle>> {
        self.read().file_entries(file).to_vec()
    }

    pub fn files(&self) -> Vec<FileId> {
        self.read().state.by_file.keys().copied().collect()
    }

    /// Total number of class entries.
    pub fn len(&self) -> usize {
        self.read().state.entries
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every update.
    pub fn revision(&self) -> u64 {
        self.read().state.revision
    }

    /// Names with at least one declaration, sorted.
    pub fn qualified_names(&self) -> Vec<String> {
        let view = self.read();
        let mut names: Vec<String> = view
            .state
            .by_name
            .keys()
            .map(|key| view.names.resolve(key).to_string())
            .collect();
        names.sort();
        names
    }
}

/// Read guard over the index. Holding it blocks writers.
///
/// The lock is not re-entrant: calling a `ProjectSymbolIndex` method from
/// the thread that holds a view may deadlock if a writer is queued.
pub struct IndexView<'a> {
    state: RwLockReadGuard<'a, IndexState>,
    names: &'a ThreadedRodeo,
}

impl IndexView<'_> {
    pub fn lookup(&self, qualified_name: &str) -> &[Arc<ClassHandle>] {
        self.names
            .get(qualified_name)
            .and_then(|key| self.state.by_name.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn first(&self, qualified_name: &str) -> Option<&Arc<ClassHandle>> {
        self.lookup(qualified_name).first()
    }

    pub fn file_entries(&self, file: FileId) -> &[Arc<ClassHandle>] {
        self.state
            .by_file
            .get(&file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn revision(&self) -> u64 {
        self.state.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn class(name: &str) -> String {
        format!(".class public L{};\n.super Ljava/lang/Object;\n", name)
    }

    #[test]
    fn test_index_and_lookup() {
        let index = ProjectSymbolIndex::new();
        assert!(index.is_empty());
        index.index_file(FileId(1), &parse(&class("com/example/Foo")));

        let found = index.lookup_by_qualified_name("com.example.Foo");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name(), "Foo");
        assert!(index.lookup_by_qualified_name("com.example.Missing").is_empty());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_reindex_replaces_entries() {
        let index = ProjectSymbolIndex::new();
        index.index_file(FileId(1), &parse(&class("com/example/Foo")));
        index.index_file(FileId(1), &parse(&class("com/example/Bar")));

        assert!(index.lookup_by_qualified_name("com.example.Foo").is_empty());
        assert_eq!(index.lookup_by_qualified_name("com.example.Bar").len(), 1);
        assert_eq!(index.qualified_names(), vec!["com.example.Bar".to_string()]);
    }

    #[test]
    fn test_remove_file() {
        let index = ProjectSymbolIndex::new();
        index.index_file(FileId(1), &parse(&class("com/example/Foo")));
        let rev = index.revision();

        assert!(index.remove_file(FileId(1)));
        assert!(!index.remove_file(FileId(1)));
        assert!(index.lookup_by_qualified_name("com.example.Foo").is_empty());
        assert!(index.files().is_empty());
        assert!(index.revision() > rev);
    }

    #[test]
    fn test_duplicates_ordered_by_file() {
        let index = ProjectSymbolIndex::new();
        index.index_file(FileId(5), &parse(&class("com/example/Foo")));
        index.index_file(FileId(2), &parse(&class("com/example/Foo")));

        let found = index.lookup_by_qualified_name("com.example.Foo");
        let files: Vec<_> = found.iter().map(|h| h.file()).collect();
        assert_eq!(files, vec![FileId(2), FileId(5)]);
        assert_eq!(
            index.first_by_qualified_name("com.example.Foo").unwrap().file(),
            FileId(2)
        );
    }

    #[test]
    fn test_broken_class_does_not_block_file() {
        let src = format!(".class public\n.super Ljava/lang/Object;\n{}", class("com/example/Ok"));
        let index = ProjectSymbolIndex::new();
        assert_eq!(index.index_file(FileId(1), &parse(&src)), 1);
        assert_eq!(index.lookup_by_qualified_name("com.example.Ok").len(), 1);
    }

    #[test]
    fn test_index_stubs_is_lazy() {
        let tree = parse(&class("com/example/Foo"));
        let decl = ClassDecl::from_syntax(tree.find_child(SyntaxKind::Class).unwrap()).unwrap();

        let index = ProjectSymbolIndex::new();
        index.index_stubs(FileId(1), 0, vec![decl.to_stub()]);
        let handle = index.first_by_qualified_name("com.example.Foo").unwrap();
        assert!(!handle.is_materialized());
        assert_eq!(handle.decl().super_class_name(), Some("java.lang.Object"));
        assert!(handle.is_materialized());
    }

    #[test]
    fn test_readers_never_see_a_half_replaced_file() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let first = parse(&format!("{}{}", class("a/Foo"), class("a/FooHelper")));
        let second = parse(&format!("{}{}", class("b/Bar"), class("b/BarHelper")));
        let index = ProjectSymbolIndex::new();
        index.index_file(FileId(1), &first);
        let done = AtomicBool::new(false);

        std::thread::scope(|scope| {
            scope.spawn(|| {
                for round in 0..500 {
                    let tree = if round % 2 == 0 { &second } else { &first };
                    index.index_file(FileId(1), tree);
                }
                done.store(true, Ordering::SeqCst);
            });

            for _ in 0..3 {
                scope.spawn(|| {
                    while !done.load(Ordering::SeqCst) {
                        let names: Vec<String> = index
                            .file_entries(FileId(1))
                            .iter()
                            .map(|h| h.qualified_name().to_string())
                            .collect();
                        assert!(
                            names == ["a.Foo", "a.FooHelper"] || names == ["b.Bar", "b.BarHelper"],
                            "mixed entries: {:?}",
                            names
                        );

                        let view = index.read();
                        let foo = !view.lookup("a.Foo").is_empty();
                        let foo_helper = !view.lookup("a.FooHelper").is_empty();
                        let bar = !view.lookup("b.Bar").is_empty();
                        let bar_helper = !view.lookup("b.BarHelper").is_empty();
                        assert_eq!(foo, foo_helper);
                        assert_eq!(bar, bar_helper);
                        assert_ne!(foo, bar);
                    }
                });
            }
        });

        assert_eq!(index.len(), 2);
        assert_eq!(index.first_by_qualified_name("a.Foo").unwrap().file(), FileId(1));
    }

    #[test]
    fn test_lookup_returns_same_handles() {
        let index = ProjectSymbolIndex::new();
        index.index_file(FileId(1), &parse(&class("com/example/Foo")));
        let a = index.first_by_qualified_name("com.example.Foo").unwrap();
        let b = index.first_by_qualified_name("com.example.Foo").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(a.decl(), b.decl()));
    }
}
