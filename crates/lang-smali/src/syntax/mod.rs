//! Typed syntax tree for smali units.
//!
//! The tree is the narrow interface the index and resolver consume: typed
//! child lookup, text extraction and ranges. [`parse`] runs the tree-sitter
//! smali grammar and converts its concrete tree; it never fails, and regions
//! the grammar rejects become [`SyntaxKind::Error`] nodes so the rest of the
//! unit still indexes.

mod kind;
mod node;
mod parser;

pub use kind::SyntaxKind;
pub use node::{Descendants, SyntaxNode};
pub use parser::parse;
