use super::{SyntaxKind, SyntaxNode};
use crate::access::AccessFlags;
use smaliscope_api::models::Range;
use std::sync::Arc;
use tracing::warn;
use tree_sitter::{Node, Parser};

type Span = std::ops::Range<usize>;

/// Parse a smali unit with the tree-sitter grammar.
///
/// Never fails: regions the grammar rejects become [`SyntaxKind::Error`]
/// nodes and the declarations around them are kept. A unit may hold several
/// classes; each `.class` section is parsed on its own so one broken class
/// does not swallow the next.
pub fn parse(text: &str) -> SyntaxNode {
    let source: Arc<str> = Arc::from(text);
    let builder = Builder::new(&source);

    let language: tree_sitter::Language = tree_sitter_smali::LANGUAGE.into();
    let mut parser = Parser::new();
    if let Err(err) = parser.set_language(&language) {
        warn!("Cannot load smali grammar: {}", err);
        return builder.file(Vec::new());
    }

    let mut items = Vec::new();
    for section in builder.sections() {
        let range = builder.ts_range(section);
        if let Err(err) = parser.set_included_ranges(&[range]) {
            warn!("Cannot parse section of smali unit: {:?}", err);
            continue;
        }
        match parser.parse(text, None) {
            Some(tree) => builder.collect(tree.root_node(), &mut items),
            None => warn!("Parser gave up on smali unit"),
        }
    }
    builder.build(items)
}

/// Where a grammar node sits. Decides how bare tokens convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    /// Class-level directives and members.
    Top,
    /// Headers of class, field and method declarations.
    Decl,
    /// Statements of a method body.
    Body,
    /// Operands of instructions, directives and annotations.
    Operand,
}

fn ts_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn is_directive_word(text: &str) -> bool {
    let mut bytes = text.bytes();
    bytes.next() == Some(b'.') && bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
}

fn is_word(text: &str) -> bool {
    text.chars()
        .next()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '"' | '\''))
}

fn is_access_word(text: &str) -> bool {
    AccessFlags::from_keyword(text).is_some()
}

fn is_any_type(kind: SyntaxKind) -> bool {
    kind.is_nonvoid_type() || kind == SyntaxKind::VoidType
}

/// Byte spans of the whitespace-separated words of `text`.
fn words(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut start = None;
    for (i, b) in text.bytes().enumerate() {
        match (b.is_ascii_whitespace(), start) {
            (true, Some(s)) => {
                spans.push(s..i);
                start = None;
            }
            (false, None) => start = Some(i),
            _ => {}
        }
    }
    if let Some(s) = start {
        spans.push(s..text.len());
    }
    spans
}

/// Converts the grammar's concrete tree into [`SyntaxNode`]s.
struct Builder<'s> {
    source: &'s Arc<str>,
    line_starts: Vec<usize>,
}

impl<'s> Builder<'s> {
    fn new(source: &'s Arc<str>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source,
            line_starts,
        }
    }

    fn position(&self, byte: usize) -> (usize, usize) {
        let line = self
            .line_starts
            .partition_point(|&start| start <= byte)
            .saturating_sub(1);
        (line, byte - self.line_starts[line])
    }

    fn text_of(&self, span: Span) -> &str {
        self.source.get(span).unwrap_or("")
    }

    fn text(&self, node: Node<'_>) -> &str {
        self.text_of(node.byte_range())
    }

    /// Node over `span`, trailing whitespace excluded.
    fn node(&self, kind: SyntaxKind, span: Span, children: Vec<SyntaxNode>) -> SyntaxNode {
        let bytes = self.source.as_bytes();
        let mut end = span.end.min(bytes.len());
        while end > span.start && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let (start_line, start_col) = self.position(span.start);
        let (end_line, end_col) = self.position(end);
        SyntaxNode::new(
            kind,
            self.source,
            span.start..end,
            Range::new(start_line, start_col, end_line, end_col),
            children,
        )
    }

    fn leaf(&self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        self.node(kind, node.byte_range(), Vec::new())
    }

    /// Node spanning `children`; zero-width at `at` when there are none.
    fn cover(&self, kind: SyntaxKind, children: Vec<SyntaxNode>, at: usize) -> SyntaxNode {
        let start = children.iter().map(|c| c.span().start).min().unwrap_or(at);
        let end = children.iter().map(|c| c.span().end).max().unwrap_or(at);
        self.node(kind, start..end, children)
    }

    fn file(&self, children: Vec<SyntaxNode>) -> SyntaxNode {
        let (end_line, end_col) = self.position(self.source.len());
        SyntaxNode::new(
            SyntaxKind::File,
            self.source,
            0..self.source.len(),
            Range::new(0, 0, end_line, end_col),
            children,
        )
    }

    /// Byte spans of the unit split before every `.class` line after the first.
    fn sections(&self) -> Vec<Span> {
        let mut starts: Vec<usize> = self
            .line_starts
            .iter()
            .copied()
            .filter(|&start| {
                self.text_of(start..self.source.len())
                    .trim_start_matches([' ', '\t'])
                    .strip_prefix(".class")
                    .is_some_and(|rest| rest.starts_with([' ', '\t']))
            })
            .skip(1)
            .collect();
        starts.insert(0, 0);
        starts.push(self.source.len());
        starts
            .windows(2)
            .map(|w| w[0]..w[1])
            .filter(|span| !span.is_empty())
            .collect()
    }

    fn point(&self, byte: usize) -> tree_sitter::Point {
        let (row, column) = self.position(byte);
        tree_sitter::Point { row, column }
    }

    fn ts_range(&self, span: Span) -> tree_sitter::Range {
        tree_sitter::Range {
            start_byte: span.start,
            end_byte: span.end,
            start_point: self.point(span.start),
            end_point: self.point(span.end),
        }
    }

    fn collect(&self, root: Node<'_>, items: &mut Vec<SyntaxNode>) {
        if root.is_error() {
            let at = root.start_byte();
            items.push(self.node(SyntaxKind::Error, at..at, Vec::new()));
        }
        for child in ts_children(root) {
            self.convert(child, Context::Top, items);
        }
    }

    fn build(&self, items: Vec<SyntaxNode>) -> SyntaxNode {
        // a class runs from its `.class` directive to the next one
        let mut children = Vec::new();
        let mut class: Vec<SyntaxNode> = Vec::new();
        for item in self.group_references(items) {
            let starts_class = item.kind() == SyntaxKind::ClassSpec;
            if starts_class && !class.is_empty() {
                children.push(self.cover(SyntaxKind::Class, std::mem::take(&mut class), 0));
            }
            if starts_class || !class.is_empty() {
                class.push(item);
            } else {
                children.push(item);
            }
        }
        if !class.is_empty() {
            children.push(self.cover(SyntaxKind::Class, class, 0));
        }
        self.file(children)
    }

    fn convert(&self, node: Node<'_>, ctx: Context, out: &mut Vec<SyntaxNode>) {
        if node.is_missing() {
            let at = node.start_byte();
            out.push(self.node(SyntaxKind::Error, at..at, Vec::new()));
            return;
        }
        if node.is_error() {
            self.error(node, ctx, out);
            return;
        }
        if node.is_extra() || node.kind() == "comment" {
            return;
        }
        if !node.is_named() {
            self.token(node, ctx, out);
            return;
        }

        match node.kind() {
            "class_directive" => out.push(self.declaration(SyntaxKind::ClassSpec, node)),
            "super_directive" => out.push(self.declaration(SyntaxKind::SuperSpec, node)),
            "implements_directive" => {
                out.push(self.declaration(SyntaxKind::ImplementsSpec, node))
            }
            "source_directive" => out.push(self.line(SyntaxKind::SourceSpec, node)),
            "field_definition" => out.push(self.field(node)),
            "method_definition" => out.push(self.method(node)),
            "method_signature" => self.signature(node, out),
            "access_modifiers" => out.push(self.access_list(node)),
            "access_modifier" => out.push(self.leaf(SyntaxKind::AccessSpec, node)),
            "class_identifier" | "class_type" => out.push(self.leaf(SyntaxKind::ClassType, node)),
            "primitive_type" | "void_type" => out.push(self.descriptor(node.byte_range())),
            "array_type" => out.push(self.array_type(node)),
            "field_type" | "type" if node.named_child_count() == 0 => {
                out.push(self.descriptor(node.byte_range()))
            }
            "field_identifier" | "method_identifier" => {
                out.push(self.leaf(SyntaxKind::MemberName, node))
            }
            "expression" | "instruction" => out.push(self.instruction(node)),
            "opcode" => out.push(self.leaf(SyntaxKind::Opcode, node)),
            "registers_directive" | "locals_directive" => {
                out.push(self.line(SyntaxKind::Registers, node))
            }
            "line_directive" => out.push(self.line(SyntaxKind::LineDirective, node)),
            "annotation_directive" | "subannotation_directive" => {
                out.push(self.line(SyntaxKind::Annotation, node))
            }
            "packed_switch_directive" | "sparse_switch_directive" | "array_data_directive" => {
                out.push(self.payload(node))
            }
            "label" | "jmp_label" => {
                let kind = if ctx == Context::Body {
                    SyntaxKind::Label
                } else {
                    SyntaxKind::LabelRef
                };
                out.push(self.leaf(kind, node));
            }
            "variable" | "parameter" | "register" => {
                out.push(self.leaf(SyntaxKind::Register, node))
            }
            "string" | "number" | "float" | "boolean" | "character" | "null" | "literal" => {
                out.push(self.leaf(SyntaxKind::Literal, node))
            }
            kind if kind.ends_with("_directive") => {
                out.push(self.line(SyntaxKind::Directive, node))
            }
            _ if node.child_count() > 0 => {
                for child in ts_children(node) {
                    self.convert(child, ctx, out);
                }
            }
            _ => out.push(self.bare(node, ctx)),
        }
    }

    /// Anonymous grammar tokens. Punctuation is dropped.
    fn token(&self, node: Node<'_>, ctx: Context, out: &mut Vec<SyntaxNode>) {
        let text = self.text(node);
        let kind = match text {
            "->" => SyntaxKind::Arrow,
            ":" => SyntaxKind::Colon,
            "=" => SyntaxKind::Literal,
            _ if is_directive_word(text) => SyntaxKind::Keyword,
            _ if ctx == Context::Decl && is_access_word(text) => SyntaxKind::AccessSpec,
            _ if ctx == Context::Operand && is_word(text) => SyntaxKind::Literal,
            _ => return,
        };
        out.push(self.leaf(kind, node));
    }

    /// A named leaf the grammar has but the tree does not model.
    fn bare(&self, node: Node<'_>, ctx: Context) -> SyntaxNode {
        let text = self.text(node);
        let kind = if is_directive_word(text) {
            SyntaxKind::Keyword
        } else if ctx == Context::Decl && is_access_word(text) {
            SyntaxKind::AccessSpec
        } else {
            SyntaxKind::Literal
        };
        self.leaf(kind, node)
    }

    fn error(&self, node: Node<'_>, ctx: Context, out: &mut Vec<SyntaxNode>) {
        let mut inner = Vec::new();
        for child in ts_children(node) {
            self.convert(child, ctx, &mut inner);
        }
        match ctx {
            // declarations and statements inside the error stay in place
            Context::Top | Context::Body => {
                let at = node.start_byte();
                out.push(self.node(SyntaxKind::Error, at..at, Vec::new()));
                out.extend(inner);
            }
            Context::Decl | Context::Operand => {
                let inner = self.group_references(inner);
                out.push(self.node(SyntaxKind::Error, node.byte_range(), inner));
            }
        }
    }

    fn convert_children(&self, node: Node<'_>, ctx: Context) -> Vec<SyntaxNode> {
        let mut out = Vec::new();
        for child in ts_children(node) {
            self.convert(child, ctx, &mut out);
        }
        self.complete_field_type(&mut out, node.end_byte());
        self.group_references(out)
    }

    /// A directive or statement whose children are operands.
    fn line(&self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        let children = self.convert_children(node, Context::Operand);
        self.node(kind, node.byte_range(), children)
    }

    fn declaration(&self, kind: SyntaxKind, node: Node<'_>) -> SyntaxNode {
        let children = self.group_access(self.convert_children(node, Context::Decl));
        self.node(kind, node.byte_range(), children)
    }

    fn field(&self, node: Node<'_>) -> SyntaxNode {
        let mut children = self.group_access(self.convert_children(node, Context::Decl));
        let initializer = children
            .iter()
            .position(|c| c.kind() == SyntaxKind::Literal && c.text() == "=");
        if let Some(eq) = initializer {
            let end = children[eq..]
                .iter()
                .position(|c| matches!(c.kind(), SyntaxKind::Annotation | SyntaxKind::Keyword))
                .map_or(children.len(), |n| eq + n);
            let value: Vec<SyntaxNode> = children.drain(eq..end).collect();
            children.insert(eq, self.cover(SyntaxKind::FieldInitializer, value, 0));
        }
        self.node(SyntaxKind::Field, node.byte_range(), children)
    }

    fn method(&self, node: Node<'_>) -> SyntaxNode {
        let header_row = node.start_position().row;
        let mut children = Vec::new();
        for child in ts_children(node) {
            let ctx = if child.start_position().row == header_row {
                Context::Decl
            } else {
                Context::Body
            };
            self.convert(child, ctx, &mut children);
        }
        let children = self.group_access(self.group_references(children));
        self.node(SyntaxKind::Method, node.byte_range(), children)
    }

    /// `name(params)ret` as a `MemberName` and a `MethodPrototype`.
    fn signature(&self, node: Node<'_>, out: &mut Vec<SyntaxNode>) {
        let start = node.start_byte();
        let end = node.end_byte();
        let text = self.text(node);
        let Some(open) = text.find('(').map(|i| start + i) else {
            out.push(self.leaf(SyntaxKind::Error, node));
            return;
        };
        let close = text.rfind(')').map_or(end, |i| start + i);
        if open > start {
            out.push(self.node(SyntaxKind::MemberName, start..open, Vec::new()));
        }

        let mut parts = Vec::new();
        for child in ts_children(node).into_iter().filter(|c| c.start_byte() >= open) {
            self.convert(child, Context::Decl, &mut parts);
        }
        let mut proto: Vec<SyntaxNode> = parts
            .into_iter()
            .map(|part| {
                if part.span().start > close && is_any_type(part.kind()) {
                    self.cover(SyntaxKind::ReturnType, vec![part], 0)
                } else {
                    part
                }
            })
            .collect();

        let ret_text = self.text_of(close.saturating_add(1).min(end)..end).trim();
        if !ret_text.is_empty() && !proto.iter().any(|p| p.kind() == SyntaxKind::ReturnType) {
            let ret = self.descriptor(close + 1..close + 1 + ret_text.len());
            proto.push(self.cover(SyntaxKind::ReturnType, vec![ret], 0));
        }
        out.push(self.node(SyntaxKind::MethodPrototype, open..end, proto));
    }

    fn access_list(&self, node: Node<'_>) -> SyntaxNode {
        let specs = if node.child_count() == 0 {
            let start = node.start_byte();
            words(self.text(node))
                .into_iter()
                .map(|w| self.node(SyntaxKind::AccessSpec, start + w.start..start + w.end, Vec::new()))
                .collect()
        } else {
            ts_children(node)
                .into_iter()
                .filter(|c| !c.is_extra())
                .map(|c| self.leaf(SyntaxKind::AccessSpec, c))
                .collect()
        };
        self.node(SyntaxKind::AccessList, node.byte_range(), specs)
    }

    fn array_type(&self, node: Node<'_>) -> SyntaxNode {
        if node.named_child_count() == 0 {
            return self.descriptor(node.byte_range());
        }
        let element = self.convert_children(node, Context::Decl);
        self.node(SyntaxKind::ArrayType, node.byte_range(), element)
    }

    /// Type node for a descriptor the grammar left as a single token.
    fn descriptor(&self, span: Span) -> SyntaxNode {
        let text = self.text_of(span.clone()).trim_end();
        let dims = text.bytes().take_while(|&b| b == b'[').count();
        if dims > 0 {
            let element = self.descriptor(span.start + dims..span.end);
            return self.node(SyntaxKind::ArrayType, span, vec![element]);
        }
        let kind = match text.as_bytes().first() {
            Some(b'L') => SyntaxKind::ClassType,
            Some(b'V') => SyntaxKind::VoidType,
            Some(_) => SyntaxKind::PrimitiveType,
            None => SyntaxKind::Error,
        };
        self.node(kind, span, Vec::new())
    }

    fn instruction(&self, node: Node<'_>) -> SyntaxNode {
        let mut children = self.convert_children(node, Context::Operand);
        let has_opcode = children.iter().any(|c| c.kind() == SyntaxKind::Opcode);
        if !has_opcode && children.first().is_some_and(|c| c.kind() == SyntaxKind::Literal) {
            let head = children.remove(0).with_kind(SyntaxKind::Opcode);
            children.insert(0, head);
        }
        self.node(SyntaxKind::Instruction, node.byte_range(), children)
    }

    /// Header line, one `PayloadEntry` per following line, then the `.end` line.
    fn payload(&self, node: Node<'_>) -> SyntaxNode {
        let first_line = node.start_position().row;
        let mut header = Vec::new();
        let mut lines: Vec<Vec<SyntaxNode>> = Vec::new();
        let mut last_line = first_line;

        for part in self.convert_children(node, Context::Operand) {
            let line = part.range().start_line;
            if line == first_line {
                header.push(part);
                continue;
            }
            if line != last_line || lines.is_empty() {
                lines.push(Vec::new());
            }
            if let Some(current) = lines.last_mut() {
                current.push(part);
            }
            last_line = line;
        }

        let mut children = vec![self.cover(SyntaxKind::Keyword, header, node.start_byte())];
        for parts in lines {
            let closing = parts
                .first()
                .is_some_and(|p| p.kind() == SyntaxKind::Keyword && p.text().starts_with(".end"));
            let kind = if closing {
                SyntaxKind::Directive
            } else {
                SyntaxKind::PayloadEntry
            };
            children.push(self.cover(kind, parts, 0));
        }
        self.node(SyntaxKind::Payload, node.byte_range(), children)
    }

    /// Wrap the first run of `AccessSpec`s into an `AccessList`.
    fn group_access(&self, mut children: Vec<SyntaxNode>) -> Vec<SyntaxNode> {
        if children.iter().any(|c| c.kind() == SyntaxKind::AccessList) {
            return children;
        }
        let Some(start) = children.iter().position(|c| c.kind() == SyntaxKind::AccessSpec) else {
            return children;
        };
        let len = children[start..]
            .iter()
            .take_while(|c| c.kind() == SyntaxKind::AccessSpec)
            .count();
        let specs: Vec<SyntaxNode> = children.drain(start..start + len).collect();
        children.insert(start, self.cover(SyntaxKind::AccessList, specs, 0));
        children
    }

    /// A `name:` whose type the grammar left unmodeled gets a type node
    /// read from the text after the colon.
    fn complete_field_type(&self, children: &mut Vec<SyntaxNode>, limit: usize) {
        let Some(colon) = children.iter().position(|c| c.kind() == SyntaxKind::Colon) else {
            return;
        };
        let next = children.get(colon + 1);
        if next.is_some_and(|n| is_any_type(n.kind())) {
            return;
        }
        let from = children[colon].span().end;
        let until = next.map_or(limit, |n| n.span().start);
        let text = self.text_of(from..until);
        let len = text
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(text.len());
        if len > 0 {
            children.insert(colon + 1, self.descriptor(from..from + len));
        }
    }

    /// Fold `Owner->name:Type` and `Owner->name(proto)ret` runs into
    /// `FieldReference` and `MethodReference` nodes.
    fn group_references(&self, nodes: Vec<SyntaxNode>) -> Vec<SyntaxNode> {
        if !nodes.iter().any(|n| n.kind() == SyntaxKind::Arrow) {
            return nodes;
        }
        let mut out: Vec<SyntaxNode> = Vec::with_capacity(nodes.len());
        let mut iter = nodes.into_iter().peekable();
        while let Some(node) = iter.next() {
            if node.kind() != SyntaxKind::Arrow {
                out.push(node);
                continue;
            }
            let has_owner = out
                .last()
                .is_some_and(|n| matches!(n.kind(), SyntaxKind::ClassType | SyntaxKind::ArrayType));
            let has_name = iter
                .peek()
                .is_some_and(|n| n.kind() == SyntaxKind::MemberName);
            if !has_owner && !has_name {
                // `0x1 -> :label` in a sparse switch
                out.push(node);
                continue;
            }

            let mut parts = Vec::new();
            if has_owner {
                parts.extend(out.pop());
            }
            parts.push(node);
            parts.extend(iter.next_if(|n| n.kind() == SyntaxKind::MemberName));
            let kind = if let Some(proto) =
                iter.next_if(|n| n.kind() == SyntaxKind::MethodPrototype)
            {
                parts.push(proto);
                SyntaxKind::MethodReference
            } else {
                if let Some(colon) = iter.next_if(|n| n.kind() == SyntaxKind::Colon) {
                    parts.push(colon);
                    parts.extend(iter.next_if(|n| n.kind().is_nonvoid_type()));
                }
                SyntaxKind::FieldReference
            };
            out.push(self.cover(kind, parts, 0));
        }
        out
    }
}
