use smaliscope_api::error::ApiError;
use smaliscope_api::models::{DeclKind, PositionContext};
use smaliscope_api::semantic::{SymbolLookup, SymbolNavigator};
use smaliscope_core::{EngineConfig, EngineHandle, ProjectRegistry, SmaliscopeEngine};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::{TempDir, tempdir};

const ANIMAL: &str = "\
.class public abstract Lcom/zoo/Animal;
.super Ljava/lang/Object;

.field protected name:Ljava/lang/String;

.method public constructor <init>()V
    .registers 1
    invoke-direct {p0}, Ljava/lang/Object;-><init>()V
    return-void
.end method

.method public abstract speak()Ljava/lang/String;
.end method
";

const DOG: &str = "\
.class public Lcom/zoo/Dog;
.super Lcom/zoo/Animal;

.method public speak()Ljava/lang/String;
    .registers 2
    iget-object v0, p0, Lcom/zoo/Dog;->name:Ljava/lang/String;
    return-object v0
.end method

.method public bark()V
    .registers 1
    invoke-virtual {p0}, Lcom/zoo/Dog;->speak()Ljava/lang/String;
    return-void
.end method
";

fn setup() -> (TempDir, TempDir, EngineHandle) {
    let dir = tempdir().unwrap();
    let index_dir = tempdir().unwrap();
    fs::write(dir.path().join("Animal.smali"), ANIMAL).unwrap();
    fs::write(dir.path().join("Dog.smali"), DOG).unwrap();

    let engine = SmaliscopeEngine::builder(dir.path().to_path_buf())
        .with_index_dir(index_dir.path())
        .build();
    let handle = EngineHandle::from_engine(Arc::new(engine));
    handle.open().unwrap();
    (dir, index_dir, handle)
}

fn position(handle: &EngineHandle, file: &str, source: &str, line: usize, needle: &str) -> PositionContext {
    let text = source.lines().nth(line).unwrap();
    PositionContext {
        path: handle.engine().root_path().join(file),
        line,
        col: text.find(needle).unwrap() + needle.len() - 1,
    }
}

#[test]
fn test_lookup_by_qualified_name() {
    let (_dir, _index, handle) = setup();

    let found = handle.lookup_by_qualified_name("com.zoo.Dog").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Dog");
    assert_eq!(found[0].kind, DeclKind::Class);
    assert!(found[0].location.path.ends_with("Dog.smali"));
    assert_eq!(found[0].location.fqn, "com.zoo.Dog");

    assert!(handle.lookup_by_qualified_name("com.zoo.Cat").unwrap().is_empty());
}

#[test]
fn test_members_of() {
    let (_dir, _index, handle) = setup();

    let members = handle.members_of("com.zoo.Animal").unwrap();
    let names: Vec<_> = members.iter().map(|m| (m.name.as_str(), m.kind)).collect();
    assert_eq!(
        names,
        vec![
            ("name", DeclKind::Field),
            ("<init>", DeclKind::Constructor),
            ("speak", DeclKind::Method),
        ]
    );
    assert_eq!(members[0].signature.as_deref(), Some("Ljava/lang/String;"));
    assert_eq!(members[2].signature.as_deref(), Some("()Ljava/lang/String;"));

    let missing = handle.members_of("com.zoo.Cat").unwrap_err();
    assert!(matches!(missing, ApiError::NotFound(_)));
}

#[test]
fn test_resolve_inherited_field_at_position() {
    let (_dir, _index, handle) = setup();

    let ctx = position(&handle, "Dog.smali", DOG, 5, "->name");
    let location = handle.resolve_at(&ctx).unwrap().unwrap();
    assert!(location.path.ends_with("Animal.smali"));
    assert_eq!(location.fqn, "com.zoo.Animal->name");
    assert_eq!(location.range.unwrap().start_line, 3);
}

#[test]
fn test_resolve_method_and_class_at_position() {
    let (_dir, _index, handle) = setup();

    let ctx = position(&handle, "Dog.smali", DOG, 11, "->speak");
    let location = handle.resolve_at(&ctx).unwrap().unwrap();
    assert_eq!(location.fqn, "com.zoo.Dog->speak()Ljava/lang/String;");
    assert!(location.path.ends_with("Dog.smali"));

    let ctx = position(&handle, "Dog.smali", DOG, 1, "Lcom/zoo/Ani");
    let location = handle.resolve_at(&ctx).unwrap().unwrap();
    assert_eq!(location.fqn, "com.zoo.Animal");
}

#[test]
fn test_resolve_nothing_and_missing_file() {
    let (_dir, _index, handle) = setup();

    let blank = PositionContext {
        path: handle.engine().root_path().join("Dog.smali"),
        line: 2,
        col: 0,
    };
    assert!(handle.resolve_at(&blank).unwrap().is_none());

    let missing = PositionContext {
        path: handle.engine().root_path().join("Nope.smali"),
        line: 0,
        col: 0,
    };
    assert!(matches!(handle.resolve_at(&missing), Err(ApiError::Internal(_))));
}

#[test]
fn test_registry_lifecycle() {
    let dir = tempdir().unwrap();
    let index_dir = tempdir().unwrap();
    fs::write(dir.path().join("Dog.smali"), DOG).unwrap();

    let registry = ProjectRegistry::new(EngineConfig::from_env().with_index_dir(index_dir.path()));
    assert!(registry.is_empty());

    let engine = registry.open(dir.path()).unwrap();
    let again = registry.open(dir.path()).unwrap();
    assert!(Arc::ptr_eq(&engine, &again));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.roots(), vec![dir.path().canonicalize().unwrap()]);
    assert!(engine.index().first_by_qualified_name("com.zoo.Dog").is_some());

    assert!(registry.close(dir.path()));
    assert!(engine.cancel_token().is_cancelled());
    assert!(registry.get(dir.path()).is_none());
    assert!(!registry.close(dir.path()));
}

#[test]
fn test_registry_rejects_missing_root() {
    let registry = ProjectRegistry::new(EngineConfig::from_env());
    assert!(registry.open(Path::new("/definitely/not/a/project")).is_err());
}
