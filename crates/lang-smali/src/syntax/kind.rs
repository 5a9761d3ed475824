/// Node kinds of a smali syntax tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxKind {
    File,
    Class,
    ClassSpec,
    SuperSpec,
    ImplementsSpec,
    SourceSpec,
    AccessList,
    AccessSpec,
    Keyword,

    Field,
    FieldInitializer,
    Method,
    MethodPrototype,
    ReturnType,
    MemberName,
    Arrow,
    Colon,

    // Type descriptor tokens
    ClassType,
    PrimitiveType,
    VoidType,
    ArrayType,

    // Method body
    Registers,
    LineDirective,
    Label,
    Directive,
    Annotation,
    Payload,
    PayloadEntry,
    Instruction,
    Opcode,
    Register,
    LabelRef,
    Literal,
    FieldReference,
    MethodReference,

    Error,
}

impl SyntaxKind {
    /// Tokens that spell a field type (never `V`).
    pub fn is_nonvoid_type(self) -> bool {
        matches!(
            self,
            SyntaxKind::ClassType | SyntaxKind::PrimitiveType | SyntaxKind::ArrayType
        )
    }
}
