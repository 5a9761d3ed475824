//! Field type descriptors and method prototypes.
//!
//! Descriptors are kept in their bytecode spelling (`Lcom/example/Foo;`,
//! `[I`, `(IJ)V`); [`TypeDescriptor::class_name`] bridges to the dotted
//! qualified names used by the index.

use smaliscope_api::models::naming::{DESCRIPTOR_SEPARATOR, TYPE_SEPARATOR};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Void,
    /// One of `Z B S C I J F D`.
    Primitive(char),
    /// Internal name, slash separated (`com/example/Foo`).
    Object(String),
    Array {
        dimensions: usize,
        element: Box<TypeDescriptor>,
    },
}

impl TypeDescriptor {
    /// Parse a complete descriptor. Trailing input or malformed names yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        match Self::parse_prefix(text)? {
            (desc, used) if used == text.len() => Some(desc),
            _ => None,
        }
    }

    /// Parse one descriptor at the start of `text`, returning it and the bytes consumed.
    pub fn parse_prefix(text: &str) -> Option<(Self, usize)> {
        let first = text.chars().next()?;
        match first {
            'V' => Some((TypeDescriptor::Void, 1)),
            'Z' | 'B' | 'S' | 'C' | 'I' | 'J' | 'F' | 'D' => {
                Some((TypeDescriptor::Primitive(first), 1))
            }
            'L' => {
                let semi = text.find(';')?;
                let internal = &text[1..semi];
                if !is_valid_internal_name(internal) {
                    return None;
                }
                Some((TypeDescriptor::Object(internal.to_string()), semi + 1))
            }
            '[' => {
                let dimensions = text.bytes().take_while(|&b| b == b'[').count();
                let (element, used) = Self::parse_prefix(&text[dimensions..])?;
                match element {
                    TypeDescriptor::Void | TypeDescriptor::Array { .. } => None,
                    element => Some((
                        TypeDescriptor::Array {
                            dimensions,
                            element: Box::new(element),
                        },
                        dimensions + used,
                    )),
                }
            }
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeDescriptor::Void)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeDescriptor::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDescriptor::Array { .. })
    }

    /// The innermost element type; `self` for non-arrays.
    pub fn element_type(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Array { element, .. } => element,
            other => other,
        }
    }

    /// Dotted qualified name of the object element type, if any.
    pub fn class_name(&self) -> Option<String> {
        match self.element_type() {
            TypeDescriptor::Object(internal) => {
                Some(internal.replace(DESCRIPTOR_SEPARATOR, &TYPE_SEPARATOR.to_string()))
            }
            _ => None,
        }
    }
}

fn is_valid_internal_name(internal: &str) -> bool {
    !internal.is_empty()
        && !internal.starts_with(DESCRIPTOR_SEPARATOR)
        && !internal.ends_with(DESCRIPTOR_SEPARATOR)
        && !internal.contains("//")
        && !internal.contains(['(', ')', ';', '[', ':', '.'])
        && !internal.contains("->")
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Void => f.write_str("V"),
            TypeDescriptor::Primitive(c) => write!(f, "{}", c),
            TypeDescriptor::Object(internal) => write!(f, "L{};", internal),
            TypeDescriptor::Array {
                dimensions,
                element,
            } => {
                for _ in 0..*dimensions {
                    f.write_str("[")?;
                }
                write!(f, "{}", element)
            }
        }
    }
}

/// A method prototype, `(params)return`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodProto {
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
}

impl MethodProto {
    pub fn new(params: Vec<TypeDescriptor>, ret: TypeDescriptor) -> Self {
        Self { params, ret }
    }

    pub fn parse(text: &str) -> Option<Self> {
        let mut rest = text.strip_prefix('(')?;
        let mut params = Vec::new();
        loop {
            if let Some(after) = rest.strip_prefix(')') {
                rest = after;
                break;
            }
            let (param, used) = TypeDescriptor::parse_prefix(rest)?;
            if param.is_void() {
                return None;
            }
            params.push(param);
            rest = &rest[used..];
        }
        let ret = TypeDescriptor::parse(rest)?;
        Some(Self { params, ret })
    }

    pub fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    pub fn return_type(&self) -> &TypeDescriptor {
        &self.ret
    }
}

impl fmt::Display for MethodProto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for p in &self.params {
            write!(f, "{}", p)?;
        }
        write!(f, "){}", self.ret)
    }
}
