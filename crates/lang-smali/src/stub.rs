//! Serializable class summaries.
//!
//! A stub carries enough of a class declaration to answer name and member
//! queries without reparsing its file. Instruction tables are not stubbed.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStub {
    pub qualified_name: SmolStr,
    pub access: u32,
    pub super_class: Option<SmolStr>,
    pub interfaces: Vec<SmolStr>,
    pub source_file: Option<SmolStr>,
    pub fields: Vec<FieldStub>,
    pub methods: Vec<MethodStub>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStub {
    pub name: SmolStr,
    pub type_descriptor: Option<SmolStr>,
    pub access: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodStub {
    pub name: SmolStr,
    pub proto: SmolStr,
    pub access: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum StubCodecError {
    #[error("Stub encode failed: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("Stub decode failed: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("Stub format version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    stubs: Vec<ClassStub>,
}

/// MessagePack codec for the stubs of one file.
pub struct StubCodec;

impl StubCodec {
    pub const VERSION: u32 = 1;

    pub fn encode(stubs: &[ClassStub]) -> Result<Vec<u8>, StubCodecError> {
        let envelope = Envelope {
            version: Self::VERSION,
            stubs: stubs.to_vec(),
        };
        Ok(rmp_serde::to_vec(&envelope)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Vec<ClassStub>, StubCodecError> {
        let envelope: Envelope = rmp_serde::from_slice(bytes)?;
        if envelope.version != Self::VERSION {
            return Err(StubCodecError::VersionMismatch {
                found: envelope.version,
                expected: Self::VERSION,
            });
        }
        Ok(envelope.stubs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ClassStub {
        ClassStub {
            qualified_name: "com.example.Foo".into(),
            access: 0x1,
            super_class: Some("java.lang.Object".into()),
            interfaces: vec!["java.lang.Runnable".into()],
            source_file: Some("Foo.java".into()),
            fields: vec![FieldStub {
                name: "bar".into(),
                type_descriptor: Some("I".into()),
                access: 0x2,
            }],
            methods: vec![MethodStub {
                name: "run".into(),
                proto: "()V".into(),
                access: 0x1,
            }],
        }
    }

    #[test]
    fn test_codec_preserves_stubs() {
        let bytes = StubCodec::encode(&[sample()]).unwrap();
        let decoded = StubCodec::decode(&bytes).unwrap();
        assert_eq!(decoded, vec![sample()]);
    }

    #[test]
    fn test_parsed_class_survives_codec() {
        use crate::model::ClassDecl;
        use crate::syntax::{SyntaxKind, parse};

        let src = "\
.class public abstract Lcom/example/Shape;
.super Ljava/lang/Object;
.implements Ljava/lang/Comparable;
.source \"Shape.java\"

.field protected sides:I

.method public abstract area()D
.end method
";
        let tree = parse(src);
        let decl = ClassDecl::from_syntax(tree.find_child(SyntaxKind::Class).unwrap()).unwrap();

        let bytes = StubCodec::encode(&[decl.to_stub()]).unwrap();
        let stubs = StubCodec::decode(&bytes).unwrap();
        assert_eq!(stubs.len(), 1);

        let rebuilt = ClassDecl::from_stub(&stubs[0]);
        assert_eq!(rebuilt.qualified_name(), "com.example.Shape");
        assert_eq!(rebuilt.qualified_name(), decl.qualified_name());
        assert_eq!(rebuilt.super_class_name(), Some("java.lang.Object"));
        assert_eq!(rebuilt.source_file(), Some("Shape.java"));
        assert_eq!(rebuilt.access(), decl.access());
        assert_eq!(rebuilt.methods()[0].proto_text(), "()D");
    }

    #[test]
    fn test_version_mismatch() {
        let bytes = rmp_serde::to_vec(&Envelope {
            version: StubCodec::VERSION + 1,
            stubs: vec![],
        })
        .unwrap();
        assert!(matches!(
            StubCodec::decode(&bytes),
            Err(StubCodecError::VersionMismatch { .. })
        ));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            StubCodec::decode(&[0xc1, 0x00]),
            Err(StubCodecError::Decode(_))
        ));
    }
}
