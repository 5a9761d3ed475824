use crate::model::ClassDecl;
use crate::stub::ClassStub;
use crate::syntax::{SyntaxKind, SyntaxNode};
use smaliscope_api::models::FileId;
use smaliscope_api::models::naming;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Re-reads the syntax tree of an indexed file on demand.
pub trait SourceLoader: Send + Sync {
    /// The tree of `file`, or `None` unless its current content still has
    /// `content_hash`.
    fn load(&self, file: FileId, content_hash: u64) -> Option<SyntaxNode>;
}

/// An index entry: a class stub plus its declaration, materialized on first
/// structural access and cached for the life of the entry.
pub struct ClassHandle {
    file: FileId,
    ordinal: u32,
    stub: ClassStub,
    /// Hash of the content the stub was built from.
    content_hash: Option<u64>,
    decl: OnceLock<Arc<ClassDecl>>,
    loader: Option<Arc<dyn SourceLoader>>,
}

impl ClassHandle {
    /// An entry whose declaration is already built.
    pub fn materialized(file: FileId, ordinal: u32, decl: ClassDecl) -> Self {
        let handle = Self {
            file,
            ordinal,
            stub: decl.to_stub(),
            content_hash: None,
            decl: OnceLock::new(),
            loader: None,
        };
        let _ = handle.decl.set(Arc::new(decl));
        handle
    }

    /// An entry restored from a stub built from content hashing to
    /// `content_hash`; the declaration is built on first access.
    pub fn from_stub(
        file: FileId,
        ordinal: u32,
        stub: ClassStub,
        content_hash: u64,
        loader: Option<Arc<dyn SourceLoader>>,
    ) -> Self {
        Self {
            file,
            ordinal,
            stub,
            content_hash: Some(content_hash),
            decl: OnceLock::new(),
            loader,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    /// Position among the declarations of its file.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn stub(&self) -> &ClassStub {
        &self.stub
    }

    pub fn qualified_name(&self) -> &str {
        &self.stub.qualified_name
    }

    pub fn name(&self) -> &str {
        naming::simple_name(&self.stub.qualified_name)
    }

    pub fn package_name(&self) -> &str {
        naming::package_name(&self.stub.qualified_name)
    }

    pub fn is_materialized(&self) -> bool {
        self.decl.get().is_some()
    }

    /// The full declaration. Every call returns the same `Arc`.
    pub fn decl(&self) -> &Arc<ClassDecl> {
        self.decl.get_or_init(|| Arc::new(self.materialize()))
    }

    fn materialize(&self) -> ClassDecl {
        let from_source = self
            .loader
            .as_ref()
            .zip(self.content_hash)
            .and_then(|(loader, hash)| loader.load(self.file, hash))
            .and_then(|tree| self.find_in(&tree));

        match from_source {
            Some(decl) => {
                trace!(class = %self.stub.qualified_name, file = %self.file, "materialized from source");
                decl
            }
            None => {
                trace!(class = %self.stub.qualified_name, file = %self.file, "materialized from stub");
                ClassDecl::from_stub(&self.stub)
            }
        }
    }

    fn find_in(&self, tree: &SyntaxNode) -> Option<ClassDecl> {
        tree.children_of_kind(SyntaxKind::Class)
            .filter_map(ClassDecl::from_syntax)
            .nth(self.ordinal as usize)
            .filter(|decl| decl.qualified_name() == self.stub.qualified_name.as_str())
    }
}

impl fmt::Debug for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassHandle")
            .field("qualified_name", &self.stub.qualified_name)
            .field("file", &self.file)
            .field("ordinal", &self.ordinal)
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SRC: &str =
        ".class public Lcom/example/A;\n.super Ljava/lang/Object;\n.method run()V\n    return-void\n.end method\n";

    const HASH: u64 = 7;

    struct CountingLoader {
        source: &'static str,
        hash: u64,
        loads: AtomicUsize,
    }

    impl CountingLoader {
        fn new(source: &'static str, hash: u64) -> Self {
            Self {
                source,
                hash,
                loads: AtomicUsize::new(0),
            }
        }
    }

    impl SourceLoader for CountingLoader {
        fn load(&self, _file: FileId, content_hash: u64) -> Option<SyntaxNode> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            (content_hash == self.hash).then(|| parse(self.source))
        }
    }

    fn stub() -> ClassStub {
        let tree = parse(SRC);
        ClassDecl::from_syntax(tree.find_child(SyntaxKind::Class).unwrap())
            .unwrap()
            .to_stub()
    }

    #[test]
    fn test_names_do_not_materialize() {
        let handle = ClassHandle::from_stub(FileId(0), 0, stub(), HASH, None);
        assert_eq!(handle.qualified_name(), "com.example.A");
        assert_eq!(handle.name(), "A");
        assert_eq!(handle.package_name(), "com.example");
        assert!(!handle.is_materialized());
    }

    #[test]
    fn test_materializes_once_from_loader() {
        let loader = Arc::new(CountingLoader::new(SRC, HASH));
        let shared: Arc<dyn SourceLoader> = loader.clone();
        let handle = ClassHandle::from_stub(FileId(3), 0, stub(), HASH, Some(shared));

        let first = Arc::clone(handle.decl());
        let second = Arc::clone(handle.decl());
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        // loaded from source, so the instruction table is present
        assert_eq!(first.methods()[0].address_for_line(3), Some(0));
    }

    #[test]
    fn test_falls_back_to_stub_when_source_changed() {
        let loader: Arc<dyn SourceLoader> = Arc::new(CountingLoader::new(
            ".class public Lcom/example/Other;\n.super Ljava/lang/Object;\n",
            HASH,
        ));
        let handle = ClassHandle::from_stub(FileId(3), 0, stub(), HASH, Some(loader));
        let decl = handle.decl();
        assert_eq!(decl.qualified_name(), "com.example.A");
        assert!(decl.range().is_none());
    }

    #[test]
    fn test_content_hash_mismatch_uses_stub() {
        // same class name on disk, but the content no longer matches the stub
        let edited = ".class public Lcom/example/A;\n.super Ljava/lang/Object;\n.field extra:I\n";
        let loader = Arc::new(CountingLoader::new(edited, HASH + 1));
        let shared: Arc<dyn SourceLoader> = loader.clone();
        let handle = ClassHandle::from_stub(FileId(3), 0, stub(), HASH, Some(shared));

        let decl = handle.decl();
        assert_eq!(loader.loads.load(Ordering::SeqCst), 1);
        assert!(decl.range().is_none());
        assert!(decl.fields().is_empty());
        assert_eq!(decl.methods().len(), 1);
    }
}
