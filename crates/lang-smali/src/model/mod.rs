//! Declaration model built from syntax trees or stubs.

mod class;
mod member;
pub mod opcodes;

pub use class::ClassDecl;
pub use member::{CONSTRUCTOR_NAME, FieldDecl, MethodDecl, STATIC_INITIALIZER_NAME};
