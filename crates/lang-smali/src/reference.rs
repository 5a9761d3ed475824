//! Reference nodes: class types, field references and method references.
//!
//! A reference wraps a syntax node and resolves it on demand. It owns no
//! result; every `resolve` goes back to the resolver.

use crate::descriptor::MethodProto;
use crate::resolver::{Declaration, Resolver};
use crate::syntax::{SyntaxKind, SyntaxNode};
use smaliscope_api::models::naming::{self, descriptor_to_qualified_name};
use smaliscope_api::{ApiError, ApiResult};

pub trait SymbolReference {
    /// The node this reference is read from.
    fn element(&self) -> &SyntaxNode;

    fn resolve(&self, resolver: &Resolver<'_>) -> Option<Declaration>;

    /// Referenced class or member name as written.
    fn name(&self) -> Option<&str>;

    fn canonical_text(&self) -> String;

    /// Byte range of the reference inside its element: the whole node.
    fn range_in_element(&self) -> std::ops::Range<usize> {
        0..self.element().text_len()
    }

    fn is_reference_to(&self, resolver: &Resolver<'_>, decl: &Declaration) -> bool {
        self.resolve(resolver)
            .is_some_and(|resolved| resolved.is_same(decl))
    }

    fn handle_element_rename(&self, _new_name: &str) -> ApiResult<SyntaxNode> {
        Err(ApiError::unsupported("rename", self.element().text()))
    }

    fn bind_to_element(&self, _decl: &Declaration) -> ApiResult<SyntaxNode> {
        Err(ApiError::unsupported("bind", self.element().text()))
    }

    /// Completion variants. None are offered.
    fn variants(&self) -> Vec<String> {
        Vec::new()
    }

    fn is_soft(&self) -> bool {
        false
    }
}

/// `Lcom/example/Foo;`
#[derive(Debug, Clone, Copy)]
pub struct ClassTypeReference<'a> {
    node: &'a SyntaxNode,
}

impl<'a> ClassTypeReference<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        (node.kind() == SyntaxKind::ClassType).then_some(Self { node })
    }

    pub fn qualified_name(&self) -> Option<String> {
        descriptor_to_qualified_name(self.node.text())
    }
}

impl SymbolReference for ClassTypeReference<'_> {
    fn element(&self) -> &SyntaxNode {
        self.node
    }

    fn resolve(&self, resolver: &Resolver<'_>) -> Option<Declaration> {
        let class = resolver.resolve_class(&self.qualified_name()?)?;
        Some(Declaration::Class(class))
    }

    fn name(&self) -> Option<&str> {
        Some(self.node.text())
    }

    fn canonical_text(&self) -> String {
        self.qualified_name()
            .unwrap_or_else(|| self.node.text().to_string())
    }
}

/// `Lcom/example/Foo;->bar:I`
#[derive(Debug, Clone, Copy)]
pub struct FieldReference<'a> {
    node: &'a SyntaxNode,
}

impl<'a> FieldReference<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        (node.kind() == SyntaxKind::FieldReference).then_some(Self { node })
    }

    pub fn owner(&self) -> Option<ClassTypeReference<'a>> {
        self.node
            .find_child(SyntaxKind::ClassType)
            .and_then(ClassTypeReference::cast)
    }

    pub fn member_name(&self) -> Option<&'a SyntaxNode> {
        self.node.find_child(SyntaxKind::MemberName)
    }

    /// The first non-void type after the colon.
    pub fn field_type(&self) -> Option<&'a SyntaxNode> {
        self.node
            .next_sibling_after(SyntaxKind::Colon, SyntaxKind::is_nonvoid_type)
    }
}

impl SymbolReference for FieldReference<'_> {
    fn element(&self) -> &SyntaxNode {
        self.node
    }

    fn resolve(&self, resolver: &Resolver<'_>) -> Option<Declaration> {
        let owner = resolver.resolve_class(&self.owner()?.qualified_name()?)?;
        let name = self.member_name()?;
        resolver.find_field(&owner, name.text())
    }

    fn name(&self) -> Option<&str> {
        self.member_name().map(|n| n.text())
    }

    fn canonical_text(&self) -> String {
        member_canonical_text(self.owner(), self.name(), self.node)
    }
}

/// `Lcom/example/Foo;->run(I)V`
#[derive(Debug, Clone, Copy)]
pub struct MethodReference<'a> {
    node: &'a SyntaxNode,
}

impl<'a> MethodReference<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        (node.kind() == SyntaxKind::MethodReference).then_some(Self { node })
    }

    pub fn owner(&self) -> Option<ClassTypeReference<'a>> {
        self.node
            .find_child(SyntaxKind::ClassType)
            .and_then(ClassTypeReference::cast)
    }

    pub fn member_name(&self) -> Option<&'a SyntaxNode> {
        self.node.find_child(SyntaxKind::MemberName)
    }

    pub fn proto(&self) -> Option<MethodProto> {
        self.node
            .find_child(SyntaxKind::MethodPrototype)
            .and_then(|p| MethodProto::parse(p.text()))
    }
}

impl SymbolReference for MethodReference<'_> {
    fn element(&self) -> &SyntaxNode {
        self.node
    }

    fn resolve(&self, resolver: &Resolver<'_>) -> Option<Declaration> {
        let owner = resolver.resolve_class(&self.owner()?.qualified_name()?)?;
        let name = self.member_name()?;
        resolver.find_method(&owner, name.text(), &self.proto()?)
    }

    fn name(&self) -> Option<&str> {
        self.member_name().map(|n| n.text())
    }

    fn canonical_text(&self) -> String {
        match self.proto() {
            Some(proto) => {
                let name = self.name().map(|n| format!("{}{}", n, proto));
                member_canonical_text(self.owner(), name.as_deref(), self.node)
            }
            None => self.node.text().to_string(),
        }
    }
}

fn member_canonical_text(
    owner: Option<ClassTypeReference<'_>>,
    member: Option<&str>,
    node: &SyntaxNode,
) -> String {
    match (owner.and_then(|o| o.qualified_name()), member) {
        (Some(owner), Some(member)) => naming::build_member_fqn(&owner, member),
        _ => node.text().to_string(),
    }
}

/// Any of the three reference kinds.
#[derive(Debug, Clone, Copy)]
pub enum AnyReference<'a> {
    ClassType(ClassTypeReference<'a>),
    Field(FieldReference<'a>),
    Method(MethodReference<'a>),
}

impl<'a> AnyReference<'a> {
    pub fn cast(node: &'a SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::ClassType => ClassTypeReference::cast(node).map(Self::ClassType),
            SyntaxKind::FieldReference => FieldReference::cast(node).map(Self::Field),
            SyntaxKind::MethodReference => MethodReference::cast(node).map(Self::Method),
            _ => None,
        }
    }

    fn inner(&self) -> &dyn SymbolReference {
        match self {
            AnyReference::ClassType(r) => r,
            AnyReference::Field(r) => r,
            AnyReference::Method(r) => r,
        }
    }
}

impl SymbolReference for AnyReference<'_> {
    fn element(&self) -> &SyntaxNode {
        self.inner().element()
    }

    fn resolve(&self, resolver: &Resolver<'_>) -> Option<Declaration> {
        self.inner().resolve(resolver)
    }

    fn name(&self) -> Option<&str> {
        self.inner().name()
    }

    fn canonical_text(&self) -> String {
        self.inner().canonical_text()
    }
}

/// Innermost reference covering a position.
pub fn reference_at(tree: &SyntaxNode, line: usize, col: usize) -> Option<AnyReference<'_>> {
    tree.path_at(line, col)
        .into_iter()
        .rev()
        .find_map(AnyReference::cast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::ProjectSymbolIndex;
    use crate::syntax::parse;
    use smaliscope_api::models::FileId;

    const FOO: &str = "\
.class public Lcom/example/Foo;
.super Ljava/lang/Object;

.field public count:I

.method public run(I)V
    iget v0, p0, Lcom/example/Foo;->count:I
    return-void
.end method
";

    fn reference_of(tree: &SyntaxNode, kind: SyntaxKind) -> AnyReference<'_> {
        tree.descendants()
            .find(|n| n.kind() == kind)
            .and_then(AnyReference::cast)
            .unwrap()
    }

    #[test]
    fn test_field_reference_parts() {
        let tree = parse(
            ".class public LUser;\n.super Ljava/lang/Object;\n.method public use()V\n    sget v0, Lcom/example/Foo;->bar:I\n.end method\n",
        );
        let node = tree
            .descendants()
            .find(|n| n.kind() == SyntaxKind::FieldReference)
            .unwrap();
        let field = FieldReference::cast(node).unwrap();
        assert_eq!(
            field.owner().unwrap().qualified_name().as_deref(),
            Some("com.example.Foo")
        );
        assert_eq!(field.name(), Some("bar"));
        assert_eq!(field.field_type().unwrap().text(), "I");
        assert_eq!(field.canonical_text(), "com.example.Foo->bar");
        assert_eq!(field.range_in_element(), 0..node.text_len());
        assert!(field.variants().is_empty());
        assert!(!field.is_soft());
    }

    #[test]
    fn test_rename_and_bind_are_unsupported() {
        let index = ProjectSymbolIndex::new();
        let tree = parse(FOO);
        index.index_file(FileId(0), &tree);
        let resolver = Resolver::new(&index);

        for kind in [
            SyntaxKind::ClassType,
            SyntaxKind::FieldReference,
        ] {
            let reference = reference_of(&tree, kind);
            let err = reference.handle_element_rename("renamed").unwrap_err();
            assert!(err.is_unsupported());

            let target = reference.resolve(&resolver).unwrap();
            assert!(reference.bind_to_element(&target).unwrap_err().is_unsupported());
        }
    }

    #[test]
    fn test_method_reference_bind_is_unsupported() {
        let src = "\
.class public Lcom/example/Foo;
.super Ljava/lang/Object;

.method public run()V
    invoke-virtual {p0}, Lcom/example/Foo;->run()V
    return-void
.end method
";
        let index = ProjectSymbolIndex::new();
        let tree = parse(src);
        index.index_file(FileId(0), &tree);
        let resolver = Resolver::new(&index);

        let reference = reference_of(&tree, SyntaxKind::MethodReference);
        assert!(matches!(reference, AnyReference::Method(_)));
        let target = reference.resolve(&resolver).unwrap();
        assert!(matches!(target, Declaration::Method { .. }));
        assert!(reference.bind_to_element(&target).unwrap_err().is_unsupported());
        assert!(
            reference
                .handle_element_rename("walk")
                .unwrap_err()
                .is_unsupported()
        );
    }

    #[test]
    fn test_is_reference_to() {
        let index = ProjectSymbolIndex::new();
        let tree = parse(FOO);
        index.index_file(FileId(0), &tree);
        let resolver = Resolver::new(&index);

        let field_ref = reference_of(&tree, SyntaxKind::FieldReference);
        let target = field_ref.resolve(&resolver).unwrap();
        assert!(field_ref.is_reference_to(&resolver, &target));

        let class = Declaration::Class(resolver.resolve_class("com.example.Foo").unwrap());
        assert!(!field_ref.is_reference_to(&resolver, &class));
    }

    #[test]
    fn test_reference_at_prefers_innermost() {
        let tree = parse(FOO);
        // cursor on the owner type inside the field reference
        let on_owner = reference_at(&tree, 6, 20).unwrap();
        assert!(matches!(on_owner, AnyReference::ClassType(_)));
        // cursor on the member name
        let on_name = reference_at(&tree, 6, 40).unwrap();
        assert!(matches!(on_name, AnyReference::Field(_)));
        assert!(reference_at(&tree, 7, 6).is_none());
    }

    #[test]
    fn test_references_cast_in_source_order() {
        let tree = parse(FOO);
        let names: Vec<String> = tree
            .descendants()
            .filter_map(AnyReference::cast)
            .map(|r| r.canonical_text())
            .collect();
        assert_eq!(
            names,
            vec![
                "com.example.Foo",
                "java.lang.Object",
                "com.example.Foo->count",
                "com.example.Foo",
            ]
        );
    }
}
