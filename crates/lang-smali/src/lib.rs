//! Smali symbol indexing and reference resolution.
//!
//! A [`ProjectSymbolIndex`] maps qualified class names to declarations
//! built from smali syntax trees (or restored from stubs). A [`Resolver`]
//! answers what a class type, field reference or method reference in a tree
//! points at, degrading to `None` on malformed or unknown input.

pub mod access;
pub mod descriptor;
pub mod index;
pub mod location;
pub mod model;
pub mod reference;
pub mod resolver;
pub mod stub;
pub mod syntax;

pub use access::AccessFlags;
pub use descriptor::{MethodProto, TypeDescriptor};
pub use index::{ClassHandle, IndexView, ProjectSymbolIndex, SourceLoader};
pub use location::{RuntimeMethod, RuntimeType};
pub use model::{ClassDecl, FieldDecl, MethodDecl};
pub use reference::{
    AnyReference, ClassTypeReference, FieldReference, MethodReference, SymbolReference,
};
pub use resolver::{Declaration, Resolver};
pub use stub::{ClassStub, FieldStub, MethodStub, StubCodec, StubCodecError};
pub use syntax::{SyntaxKind, SyntaxNode, parse};

/// File extension of smali units.
pub const SMALI_EXTENSION: &str = "smali";
