use super::SyntaxKind;
use smaliscope_api::models::Range;
use std::fmt;
use std::sync::Arc;

/// An immutable node of a parsed smali unit.
///
/// Every node shares the unit's source text; `text()` is a slice of it, so
/// cloning a subtree never copies source.
#[derive(Clone)]
pub struct SyntaxNode {
    kind: SyntaxKind,
    source: Arc<str>,
    span: std::ops::Range<usize>,
    range: Range,
    children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    pub fn new(
        kind: SyntaxKind,
        source: &Arc<str>,
        span: std::ops::Range<usize>,
        range: Range,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind,
            source: Arc::clone(source),
            span,
            range,
            children,
        }
    }

    pub(super) fn with_kind(mut self, kind: SyntaxKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn kind(&self) -> SyntaxKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        self.source.get(self.span.clone()).unwrap_or("")
    }

    pub fn text_len(&self) -> usize {
        self.span.len()
    }

    pub fn range(&self) -> Range {
        self.range
    }

    /// Byte span inside the unit's source.
    pub fn span(&self) -> std::ops::Range<usize> {
        self.span.clone()
    }

    pub fn children(&self) -> &[SyntaxNode] {
        &self.children
    }

    pub fn find_child(&self, kind: SyntaxKind) -> Option<&SyntaxNode> {
        self.children.iter().find(|c| c.kind == kind)
    }

    pub fn children_of_kind(&self, kind: SyntaxKind) -> impl Iterator<Item = &SyntaxNode> + '_ {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// First child after the first `anchor` child that satisfies `pred`.
    pub fn next_sibling_after(
        &self,
        anchor: SyntaxKind,
        pred: impl Fn(SyntaxKind) -> bool,
    ) -> Option<&SyntaxNode> {
        let pos = self.children.iter().position(|c| c.kind == anchor)?;
        self.children[pos + 1..].iter().find(|c| pred(c.kind))
    }

    /// Pre-order traversal including `self`.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Nodes whose range contains the position, outermost first.
    pub fn path_at(&self, line: usize, col: usize) -> Vec<&SyntaxNode> {
        let mut path = Vec::new();
        if !self.range.contains(line, col) {
            return path;
        }
        let mut current = self;
        path.push(current);
        while let Some(child) = current
            .children
            .iter()
            .find(|c| c.range.contains(line, col))
        {
            path.push(child);
            current = child;
        }
        path
    }
}

impl PartialEq for SyntaxNode {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.span == other.span
            && self.text() == other.text()
            && self.children == other.children
    }
}

impl Eq for SyntaxNode {}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("SyntaxNode");
        s.field("kind", &self.kind).field("range", &self.range);
        if self.children.is_empty() {
            s.field("text", &self.text());
        } else {
            s.field("children", &self.children);
        }
        s.finish()
    }
}

pub struct Descendants<'a> {
    stack: Vec<&'a SyntaxNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
