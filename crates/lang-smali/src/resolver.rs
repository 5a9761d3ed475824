use crate::descriptor::MethodProto;
use crate::index::{ClassHandle, IndexView, ProjectSymbolIndex};
use crate::model::{FieldDecl, MethodDecl};
use crate::reference::{AnyReference, SymbolReference};
use crate::syntax::SyntaxNode;
use smaliscope_api::models::naming::{self, descriptor_to_qualified_name};
use smaliscope_api::models::{DeclKind, FileId, Range};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// What a reference resolves to.
///
/// Equality is identity: two declarations are equal only when they are the
/// same index entry (or the same member of it).
#[derive(Debug, Clone)]
pub enum Declaration {
    Class(Arc<ClassHandle>),
    Field {
        owner: Arc<ClassHandle>,
        field: Arc<FieldDecl>,
    },
    Method {
        owner: Arc<ClassHandle>,
        method: Arc<MethodDecl>,
    },
}

impl Declaration {
    pub fn owner(&self) -> &Arc<ClassHandle> {
        match self {
            Declaration::Class(class) => class,
            Declaration::Field { owner, .. } | Declaration::Method { owner, .. } => owner,
        }
    }

    pub fn file(&self) -> FileId {
        self.owner().file()
    }

    pub fn kind(&self) -> DeclKind {
        match self {
            Declaration::Class(class) => class.decl().kind(),
            Declaration::Field { .. } => DeclKind::Field,
            Declaration::Method { method, .. } if method.is_constructor() => DeclKind::Constructor,
            Declaration::Method { .. } => DeclKind::Method,
        }
    }

    /// Simple name of the class or member.
    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(class) => class.name(),
            Declaration::Field { field, .. } => field.name(),
            Declaration::Method { method, .. } => method.name(),
        }
    }

    /// `com.example.Foo`, `com.example.Foo->bar` or `com.example.Foo->run(I)V`.
    pub fn qualified_name(&self) -> String {
        match self {
            Declaration::Class(class) => class.qualified_name().to_string(),
            Declaration::Field { owner, field } => {
                naming::build_member_fqn(owner.qualified_name(), field.name())
            }
            Declaration::Method { owner, method } => {
                naming::build_member_fqn(owner.qualified_name(), &method.signature())
            }
        }
    }

    /// Field type or method prototype.
    pub fn signature(&self) -> Option<String> {
        match self {
            Declaration::Class(_) => None,
            Declaration::Field { field, .. } => field.type_descriptor().map(str::to_string),
            Declaration::Method { method, .. } => Some(method.proto_text().to_string()),
        }
    }

    /// Range of the declaration in its file, when known.
    pub fn range(&self) -> Option<Range> {
        match self {
            Declaration::Class(class) => class.decl().name_range(),
            Declaration::Field { field, .. } => field.range(),
            Declaration::Method { method, .. } => method.range(),
        }
    }

    pub fn is_same(&self, other: &Declaration) -> bool {
        match (self, other) {
            (Declaration::Class(a), Declaration::Class(b)) => Arc::ptr_eq(a, b),
            (Declaration::Field { field: a, .. }, Declaration::Field { field: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            (Declaration::Method { method: a, .. }, Declaration::Method { method: b, .. }) => {
                Arc::ptr_eq(a, b)
            }
            _ => false,
        }
    }
}

impl PartialEq for Declaration {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other)
    }
}

impl Eq for Declaration {}

/// Resolves references against one consistent view of the index.
///
/// Ambiguous names resolve to the first candidate in `(file, ordinal)`
/// order. Nothing is cached; every call recomputes from the view.
///
/// A resolver holds the index read lock until it is dropped. While one is
/// alive, do lookups through it or [`Resolver::view`], not through the
/// `ProjectSymbolIndex` methods: those take the lock again, and a second
/// read on the same thread can deadlock once a writer is waiting.
pub struct Resolver<'a> {
    view: IndexView<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a ProjectSymbolIndex) -> Self {
        Self {
            view: index.read(),
        }
    }

    pub fn view(&self) -> &IndexView<'a> {
        &self.view
    }

    pub fn resolve_class(&self, qualified_name: &str) -> Option<Arc<ClassHandle>> {
        self.view.first(qualified_name).cloned()
    }

    /// Resolve `Lcom/example/Foo;`. Arrays resolve to their element class.
    pub fn resolve_class_descriptor(&self, descriptor: &str) -> Option<Arc<ClassHandle>> {
        let element = descriptor.trim_start_matches('[');
        let qualified_name = descriptor_to_qualified_name(element)?;
        self.resolve_class(&qualified_name)
    }

    /// Direct supertypes that resolve: the super class, then interfaces.
    pub fn supers(&self, class: &ClassHandle) -> Vec<Arc<ClassHandle>> {
        let decl = class.decl();
        decl.super_class_name()
            .into_iter()
            .chain(decl.interface_names().iter().map(|i| i.as_str()))
            .filter_map(|name| self.resolve_class(name))
            .collect()
    }

    /// Whether `class` extends or implements `base`, directly or transitively.
    pub fn is_inheritor(&self, class: &ClassHandle, base: &str) -> bool {
        let mut visited = HashSet::new();
        let mut pending = self.supers(class);
        while let Some(next) = pending.pop() {
            if next.qualified_name() == base {
                return true;
            }
            if visited.insert(next.qualified_name().to_string()) {
                pending.extend(self.supers(&next));
            }
        }
        false
    }

    /// Field by name: declared fields, then superinterfaces, then the super class.
    pub fn find_field(&self, class: &Arc<ClassHandle>, name: &str) -> Option<Declaration> {
        let mut visited = HashSet::new();
        self.find_field_in(class, name, &mut visited)
    }

    fn find_field_in(
        &self,
        class: &Arc<ClassHandle>,
        name: &str,
        visited: &mut HashSet<String>,
    ) -> Option<Declaration> {
        if !visited.insert(class.qualified_name().to_string()) {
            return None;
        }
        let decl = class.decl();
        if let Some(field) = decl.find_field_by_name(name) {
            return Some(Declaration::Field {
                owner: Arc::clone(class),
                field: Arc::clone(field),
            });
        }
        for iface in decl.interface_names() {
            if let Some(found) = self
                .resolve_class(iface)
                .and_then(|i| self.find_field_in(&i, name, visited))
            {
                return Some(found);
            }
        }
        let sup = self.resolve_class(decl.super_class_name()?)?;
        self.find_field_in(&sup, name, visited)
    }

    /// Method by name and prototype: the class and its super chain, then
    /// interfaces of that chain.
    pub fn find_method(
        &self,
        class: &Arc<ClassHandle>,
        name: &str,
        proto: &MethodProto,
    ) -> Option<Declaration> {
        let chain = self.super_chain(class);
        for owner in &chain {
            if let Some(method) = owner.decl().find_method_by_signature(name, proto) {
                return Some(Declaration::Method {
                    owner: Arc::clone(owner),
                    method: Arc::clone(method),
                });
            }
        }

        let mut visited: HashSet<String> =
            chain.iter().map(|c| c.qualified_name().to_string()).collect();
        let mut pending: Vec<Arc<ClassHandle>> = chain
            .iter()
            .flat_map(|c| self.interfaces_of(c))
            .collect();
        pending.reverse();
        while let Some(iface) = pending.pop() {
            if !visited.insert(iface.qualified_name().to_string()) {
                continue;
            }
            if let Some(method) = iface.decl().find_method_by_signature(name, proto) {
                return Some(Declaration::Method {
                    owner: Arc::clone(&iface),
                    method: Arc::clone(method),
                });
            }
            let mut more = self.interfaces_of(&iface);
            more.reverse();
            pending.extend(more);
        }
        None
    }

    /// Every method named `name` visible from `class`, nearest first.
    pub fn find_methods_by_name(&self, class: &Arc<ClassHandle>, name: &str) -> Vec<Declaration> {
        let mut found = Vec::new();
        let mut visited = HashSet::new();
        let mut pending = vec![Arc::clone(class)];
        while !pending.is_empty() {
            let owner = pending.remove(0);
            if !visited.insert(owner.qualified_name().to_string()) {
                continue;
            }
            found.extend(owner.decl().find_methods_by_name(name).map(|m| {
                Declaration::Method {
                    owner: Arc::clone(&owner),
                    method: Arc::clone(m),
                }
            }));
            pending.extend(self.supers(&owner));
        }
        found
    }

    fn super_chain(&self, class: &Arc<ClassHandle>) -> Vec<Arc<ClassHandle>> {
        let mut chain = vec![Arc::clone(class)];
        let mut seen = HashSet::from([class.qualified_name().to_string()]);
        let mut current = Arc::clone(class);
        while let Some(sup) = current
            .decl()
            .super_class_name()
            .and_then(|name| self.resolve_class(name))
        {
            if !seen.insert(sup.qualified_name().to_string()) {
                break;
            }
            chain.push(Arc::clone(&sup));
            current = sup;
        }
        chain
    }

    fn interfaces_of(&self, class: &ClassHandle) -> Vec<Arc<ClassHandle>> {
        class
            .decl()
            .interface_names()
            .iter()
            .filter_map(|name| self.resolve_class(name))
            .collect()
    }

    /// Resolve a reference node. Non-reference nodes resolve to nothing.
    pub fn resolve(&self, node: &SyntaxNode) -> Option<Declaration> {
        AnyReference::cast(node)?.resolve(self)
    }

    /// Resolve the innermost reference covering a position of `tree`.
    pub fn resolve_at(&self, tree: &SyntaxNode, line: usize, col: usize) -> Option<Declaration> {
        let reference = crate::reference::reference_at(tree, line, col)?;
        let resolved = reference.resolve(self);
        if resolved.is_none() {
            debug!(line, col, text = reference.element().text(), "unresolved reference");
        }
        resolved
    }
}
