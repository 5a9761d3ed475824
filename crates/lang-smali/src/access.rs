use crate::syntax::{SyntaxKind, SyntaxNode};
use bitflags::bitflags;

bitflags! {
    /// Access flags as encoded in dex files.
    ///
    /// Some bits are shared between member kinds (`VOLATILE`/`BRIDGE`,
    /// `TRANSIENT`/`VARARGS`); meaning depends on where the flag appears.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AccessFlags: u32 {
        const PUBLIC = 0x1;
        const PRIVATE = 0x2;
        const PROTECTED = 0x4;
        const STATIC = 0x8;
        const FINAL = 0x10;
        const SYNCHRONIZED = 0x20;
        const VOLATILE = 0x40;
        const BRIDGE = 0x40;
        const TRANSIENT = 0x80;
        const VARARGS = 0x80;
        const NATIVE = 0x100;
        const INTERFACE = 0x200;
        const ABSTRACT = 0x400;
        const STRICTFP = 0x800;
        const SYNTHETIC = 0x1000;
        const ANNOTATION = 0x2000;
        const ENUM = 0x4000;
        const CONSTRUCTOR = 0x10000;
        const DECLARED_SYNCHRONIZED = 0x20000;
    }
}

impl AccessFlags {
    /// The flag spelled by a smali access keyword.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        let flag = match keyword {
            "public" => Self::PUBLIC,
            "private" => Self::PRIVATE,
            "protected" => Self::PROTECTED,
            "static" => Self::STATIC,
            "final" => Self::FINAL,
            "synchronized" => Self::SYNCHRONIZED,
            "volatile" => Self::VOLATILE,
            "bridge" => Self::BRIDGE,
            "transient" => Self::TRANSIENT,
            "varargs" => Self::VARARGS,
            "native" => Self::NATIVE,
            "interface" => Self::INTERFACE,
            "abstract" => Self::ABSTRACT,
            "strictfp" => Self::STRICTFP,
            "synthetic" => Self::SYNTHETIC,
            "annotation" => Self::ANNOTATION,
            "enum" => Self::ENUM,
            "constructor" => Self::CONSTRUCTOR,
            "declared-synchronized" => Self::DECLARED_SYNCHRONIZED,
            _ => return None,
        };
        Some(flag)
    }

    /// Flags of a declaration's `AccessList` child. Unknown keywords are ignored.
    pub fn from_declaration(decl: &SyntaxNode) -> Self {
        decl.find_child(SyntaxKind::AccessList)
            .map(|list| {
                list.children_of_kind(SyntaxKind::AccessSpec)
                    .filter_map(|spec| Self::from_keyword(spec.text()))
                    .fold(Self::empty(), |acc, flag| acc | flag)
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn test_keywords() {
        assert_eq!(AccessFlags::from_keyword("public"), Some(AccessFlags::PUBLIC));
        assert_eq!(
            AccessFlags::from_keyword("declared-synchronized"),
            Some(AccessFlags::DECLARED_SYNCHRONIZED)
        );
        assert_eq!(AccessFlags::from_keyword("publik"), None);
        assert_eq!(AccessFlags::BRIDGE, AccessFlags::VOLATILE);
    }

    #[test]
    fn test_from_declaration() {
        let file = parse(".class public abstract interface Lcom/example/Api;\n.super Ljava/lang/Object;\n");
        let spec = file
            .find_child(SyntaxKind::Class)
            .and_then(|c| c.find_child(SyntaxKind::ClassSpec))
            .unwrap();
        let flags = AccessFlags::from_declaration(spec);
        assert!(flags.contains(AccessFlags::PUBLIC | AccessFlags::ABSTRACT | AccessFlags::INTERFACE));
        assert!(!flags.contains(AccessFlags::FINAL));
    }
}
