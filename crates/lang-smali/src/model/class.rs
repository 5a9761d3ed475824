use super::member::{CONSTRUCTOR_NAME, FieldDecl, MethodDecl, STATIC_INITIALIZER_NAME};
use crate::access::AccessFlags;
use crate::descriptor::MethodProto;
use crate::stub::ClassStub;
use crate::syntax::{SyntaxKind, SyntaxNode};
use smaliscope_api::models::naming::{self, descriptor_to_qualified_name};
use smaliscope_api::models::{DeclKind, Range};
use smol_str::SmolStr;
use std::sync::Arc;

/// A class declaration of a smali unit.
///
/// Immutable once built; a reparse of the owning file replaces it. Members
/// are `Arc`s so resolution results can be compared by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    qualified_name: SmolStr,
    access: AccessFlags,
    super_class: Option<SmolStr>,
    interfaces: Vec<SmolStr>,
    source_file: Option<SmolStr>,
    fields: Vec<Arc<FieldDecl>>,
    methods: Vec<Arc<MethodDecl>>,
    range: Option<Range>,
    name_range: Option<Range>,
}

impl ClassDecl {
    /// Build from a `Class` subtree.
    ///
    /// The name comes from the `ClassType` token of the class spec with the
    /// leading `L` and trailing `;` stripped and `/` turned into `.`. A class
    /// with no spec or no valid type token is not a declaration.
    pub fn from_syntax(class: &SyntaxNode) -> Option<Self> {
        let spec = class.find_child(SyntaxKind::ClassSpec)?;
        let class_type = spec.find_child(SyntaxKind::ClassType)?;
        let qualified_name = descriptor_to_qualified_name(class_type.text())?;

        let super_class = class
            .find_child(SyntaxKind::SuperSpec)
            .and_then(type_name_of);
        let interfaces = class
            .children_of_kind(SyntaxKind::ImplementsSpec)
            .filter_map(type_name_of)
            .collect();
        let source_file = class
            .find_child(SyntaxKind::SourceSpec)
            .and_then(|s| s.find_child(SyntaxKind::Literal))
            .map(|lit| SmolStr::new(lit.text().trim_matches('"')));

        let fields = class
            .children_of_kind(SyntaxKind::Field)
            .filter_map(|f| FieldDecl::from_syntax(&qualified_name, f))
            .map(Arc::new)
            .collect();
        let methods = class
            .children_of_kind(SyntaxKind::Method)
            .filter_map(|m| MethodDecl::from_syntax(&qualified_name, m))
            .map(Arc::new)
            .collect();

        Some(Self {
            access: AccessFlags::from_declaration(spec),
            qualified_name: qualified_name.into(),
            super_class,
            interfaces,
            source_file,
            fields,
            methods,
            range: Some(class.range()),
            name_range: Some(class_type.range()),
        })
    }

    pub fn from_stub(stub: &ClassStub) -> Self {
        let owner = stub.qualified_name.as_str();
        Self {
            qualified_name: stub.qualified_name.clone(),
            access: AccessFlags::from_bits_retain(stub.access),
            super_class: stub.super_class.clone(),
            interfaces: stub.interfaces.clone(),
            source_file: stub.source_file.clone(),
            fields: stub
                .fields
                .iter()
                .map(|f| Arc::new(FieldDecl::from_stub(owner, f)))
                .collect(),
            methods: stub
                .methods
                .iter()
                .map(|m| Arc::new(MethodDecl::from_stub(owner, m)))
                .collect(),
            range: None,
            name_range: None,
        }
    }

    pub fn to_stub(&self) -> ClassStub {
        ClassStub {
            qualified_name: self.qualified_name.clone(),
            access: self.access.bits(),
            super_class: self.super_class.clone(),
            interfaces: self.interfaces.clone(),
            source_file: self.source_file.clone(),
            fields: self.fields.iter().map(|f| f.to_stub()).collect(),
            methods: self.methods.iter().map(|m| m.to_stub()).collect(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Simple name: the part after the last `.`.
    pub fn name(&self) -> &str {
        naming::simple_name(&self.qualified_name)
    }

    /// Package, or `""` for the default package.
    pub fn package_name(&self) -> &str {
        naming::package_name(&self.qualified_name)
    }

    pub fn access(&self) -> AccessFlags {
        self.access
    }

    pub fn kind(&self) -> DeclKind {
        if self.is_annotation_type() {
            DeclKind::Annotation
        } else if self.is_interface() {
            DeclKind::Interface
        } else if self.is_enum() {
            DeclKind::Enum
        } else {
            DeclKind::Class
        }
    }

    /// Annotation types carry the interface bit too; they are not interfaces here.
    pub fn is_interface(&self) -> bool {
        self.access.contains(AccessFlags::INTERFACE) && !self.is_annotation_type()
    }

    pub fn is_annotation_type(&self) -> bool {
        self.access.contains(AccessFlags::ANNOTATION)
    }

    pub fn is_enum(&self) -> bool {
        self.access.contains(AccessFlags::ENUM)
            && !self.access.contains(AccessFlags::INTERFACE)
            && !self.is_annotation_type()
    }

    /// A plain class: none of interface, annotation type or enum.
    pub fn is_class(&self) -> bool {
        !self.is_interface() && !self.is_annotation_type() && !self.is_enum()
    }

    pub fn super_class_name(&self) -> Option<&str> {
        self.super_class.as_deref()
    }

    pub fn interface_names(&self) -> &[SmolStr] {
        &self.interfaces
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn fields(&self) -> &[Arc<FieldDecl>] {
        &self.fields
    }

    pub fn methods(&self) -> &[Arc<MethodDecl>] {
        &self.methods
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Arc<MethodDecl>> {
        self.find_methods_by_name(CONSTRUCTOR_NAME)
    }

    pub fn initializers(&self) -> impl Iterator<Item = &Arc<MethodDecl>> {
        self.find_methods_by_name(STATIC_INITIALIZER_NAME)
    }

    /// Not modelled: inner classes live in their own units.
    pub fn inner_classes(&self) -> &[Arc<ClassDecl>] {
        &[]
    }

    /// Not modelled.
    pub fn annotations(&self) -> &[SmolStr] {
        &[]
    }

    /// Declared field by exact name. Inherited fields are found by the resolver.
    pub fn find_field_by_name(&self, name: &str) -> Option<&Arc<FieldDecl>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn find_methods_by_name<'a>(
        &'a self,
        name: &str,
    ) -> impl Iterator<Item = &'a Arc<MethodDecl>> {
        self.methods.iter().filter(move |m| m.name() == name)
    }

    pub fn find_method_by_signature(
        &self,
        name: &str,
        proto: &MethodProto,
    ) -> Option<&Arc<MethodDecl>> {
        self.find_methods_by_name(name)
            .find(|m| m.proto() == Some(proto))
    }

    /// Whole class range; `None` when rebuilt from a stub.
    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Range of the declaring type token.
    pub fn name_range(&self) -> Option<Range> {
        self.name_range
    }
}

fn type_name_of(spec: &SyntaxNode) -> Option<SmolStr> {
    let class_type = spec.find_child(SyntaxKind::ClassType)?;
    descriptor_to_qualified_name(class_type.text()).map(SmolStr::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    fn class_of(src: &str) -> Option<ClassDecl> {
        let file = parse(src);
        ClassDecl::from_syntax(file.find_child(SyntaxKind::Class)?)
    }

    const FOO: &str = r#".class public final Lcom/example/Foo;
.super Lcom/example/Base;
.implements Ljava/lang/Runnable;
.source "Foo.java"

.field private bar:I
.field public static final NAME:Ljava/lang/String;

.method static constructor <clinit>()V
    return-void
.end method

.method public constructor <init>()V
    return-void
.end method

.method public run()V
    return-void
.end method

.method public run(I)V
    return-void
.end method
"#;

    #[test]
    fn test_name_and_package() {
        let class = class_of(FOO).unwrap();
        assert_eq!(class.qualified_name(), "com.example.Foo");
        assert_eq!(class.name(), "Foo");
        assert_eq!(class.package_name(), "com.example");
        assert_eq!(
            format!("{}.{}", class.package_name(), class.name()),
            class.qualified_name()
        );
    }

    #[test]
    fn test_default_package() {
        let class = class_of(".class public LFoo;\n.super Ljava/lang/Object;\n").unwrap();
        assert_eq!(class.name(), "Foo");
        assert_eq!(class.package_name(), "");
        assert!(class.fields().is_empty());
        assert!(class.methods().is_empty());
        assert_eq!(class.super_class_name(), Some("java.lang.Object"));
    }

    #[test]
    fn test_members() {
        let class = class_of(FOO).unwrap();
        assert_eq!(class.super_class_name(), Some("com.example.Base"));
        let interfaces: Vec<&str> = class.interface_names().iter().map(|i| i.as_str()).collect();
        assert_eq!(interfaces, vec!["java.lang.Runnable"]);
        assert_eq!(class.source_file(), Some("Foo.java"));
        assert_eq!(class.fields().len(), 2);
        assert_eq!(class.constructors().count(), 1);
        assert_eq!(class.initializers().count(), 1);
        assert_eq!(class.find_methods_by_name("run").count(), 2);
        assert!(class.find_field_by_name("bar").is_some());
        assert!(class.find_field_by_name("baz").is_none());
        assert!(class.inner_classes().is_empty());
        assert!(class.annotations().is_empty());

        let proto = MethodProto::parse("(I)V").unwrap();
        let run_int = class.find_method_by_signature("run", &proto).unwrap();
        assert_eq!(run_int.proto_text(), "(I)V");
    }

    #[test]
    fn test_missing_type_token_is_not_a_declaration() {
        assert!(class_of(".class public\n.field x:I\n").is_none());
        assert!(class_of(".class public Lcom/example/Broken\n").is_none());
        assert!(class_of(".class public [Lcom/example/Foo;\n").is_none());
    }

    #[test]
    fn test_classification() {
        let iface = class_of(".class public abstract interface Lcom/example/Api;\n.super Ljava/lang/Object;\n").unwrap();
        assert_eq!(iface.kind(), DeclKind::Interface);

        let anno =
            class_of(".class public abstract interface annotation Lcom/example/Marker;\n.super Ljava/lang/Object;\n").unwrap();
        assert_eq!(anno.kind(), DeclKind::Annotation);

        let en = class_of(".class public final enum Lcom/example/Color;\n.super Ljava/lang/Object;\n").unwrap();
        assert!(en.is_enum());
        assert_eq!(en.kind(), DeclKind::Enum);
    }

    #[test]
    fn test_exactly_one_classification_holds() {
        let cases = [
            (".class public Lcom/example/Plain;
.super Ljava/lang/Object;
", DeclKind::Class),
            (".class public abstract interface Lcom/example/Api;
.super Ljava/lang/Object;
", DeclKind::Interface),
            (
                ".class public abstract interface annotation Lcom/example/Marker;
.super Ljava/lang/Object;
",
                DeclKind::Annotation,
            ),
            (".class public final enum Lcom/example/Color;
.super Ljava/lang/Object;
", DeclKind::Enum),
            (".class public interface enum Lcom/example/Odd;
.super Ljava/lang/Object;
", DeclKind::Interface),
        ];
        for (src, expected) in cases {
            let class = class_of(src).unwrap();
            let flags = [
                class.is_class(),
                class.is_interface(),
                class.is_annotation_type(),
                class.is_enum(),
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{}", src);
            assert_eq!(class.kind(), expected, "{}", src);
            let kind_flag = match expected {
                DeclKind::Class => flags[0],
                DeclKind::Interface => flags[1],
                DeclKind::Annotation => flags[2],
                DeclKind::Enum => flags[3],
                _ => false,
            };
            assert!(kind_flag, "{}", src);
        }
    }

    #[test]
    fn test_stub_rebuild() {
        let class = class_of(FOO).unwrap();
        let rebuilt = ClassDecl::from_stub(&class.to_stub());
        assert_eq!(rebuilt.qualified_name(), class.qualified_name());
        assert_eq!(rebuilt.access(), class.access());
        assert_eq!(rebuilt.methods().len(), 4);
        assert!(rebuilt.range().is_none());
        assert_eq!(rebuilt.to_stub(), class.to_stub());
    }
}
