use super::opcodes::{instruction_size, payload_size};
use crate::access::AccessFlags;
use crate::descriptor::{MethodProto, TypeDescriptor};
use crate::stub::{FieldStub, MethodStub};
use crate::syntax::{SyntaxKind, SyntaxNode};
use smaliscope_api::models::Range;
use smol_str::SmolStr;
use tracing::trace;

pub const CONSTRUCTOR_NAME: &str = "<init>";
pub const STATIC_INITIALIZER_NAME: &str = "<clinit>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    owner: SmolStr,
    name: SmolStr,
    type_descriptor: Option<SmolStr>,
    access: AccessFlags,
    range: Option<Range>,
}

impl FieldDecl {
    /// Build from a `Field` node. A field without a name is not a declaration.
    pub fn from_syntax(owner: &str, node: &SyntaxNode) -> Option<Self> {
        let name = node.find_child(SyntaxKind::MemberName)?;
        let type_descriptor = node
            .next_sibling_after(SyntaxKind::Colon, SyntaxKind::is_nonvoid_type)
            .map(|ty| SmolStr::new(ty.text()));
        Some(Self {
            owner: owner.into(),
            name: name.text().into(),
            type_descriptor,
            access: AccessFlags::from_declaration(node),
            range: Some(node.range()),
        })
    }

    pub fn from_stub(owner: &str, stub: &FieldStub) -> Self {
        Self {
            owner: owner.into(),
            name: stub.name.clone(),
            type_descriptor: stub.type_descriptor.clone(),
            access: AccessFlags::from_bits_retain(stub.access),
            range: None,
        }
    }

    pub fn to_stub(&self) -> FieldStub {
        FieldStub {
            name: self.name.clone(),
            type_descriptor: self.type_descriptor.clone(),
            access: self.access.bits(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified name of the declaring class.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn type_descriptor(&self) -> Option<&str> {
        self.type_descriptor.as_deref()
    }

    pub fn field_type(&self) -> Option<TypeDescriptor> {
        self.type_descriptor.as_deref().and_then(TypeDescriptor::parse)
    }

    pub fn access(&self) -> AccessFlags {
        self.access
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    /// Declaration range; `None` when rebuilt from a stub.
    pub fn range(&self) -> Option<Range> {
        self.range
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDecl {
    owner: SmolStr,
    name: SmolStr,
    proto_text: SmolStr,
    proto: Option<MethodProto>,
    access: AccessFlags,
    range: Option<Range>,
    /// `(line, byte address)` of each sized instruction, in source order.
    addresses: Vec<(usize, u32)>,
}

impl MethodDecl {
    pub fn from_syntax(owner: &str, node: &SyntaxNode) -> Option<Self> {
        let name = node.find_child(SyntaxKind::MemberName)?;
        let proto_text = node
            .find_child(SyntaxKind::MethodPrototype)
            .map(|p| p.text())
            .unwrap_or("");
        Some(Self {
            owner: owner.into(),
            name: name.text().into(),
            proto_text: proto_text.into(),
            proto: MethodProto::parse(proto_text),
            access: AccessFlags::from_declaration(node),
            range: Some(node.range()),
            addresses: address_table(node),
        })
    }

    pub fn from_stub(owner: &str, stub: &MethodStub) -> Self {
        Self {
            owner: owner.into(),
            name: stub.name.clone(),
            proto: MethodProto::parse(&stub.proto),
            proto_text: stub.proto.clone(),
            access: AccessFlags::from_bits_retain(stub.access),
            range: None,
            addresses: Vec::new(),
        }
    }

    pub fn to_stub(&self) -> MethodStub {
        MethodStub {
            name: self.name.clone(),
            proto: self.proto_text.clone(),
            access: self.access.bits(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Parsed prototype; `None` if the declaration's prototype is malformed.
    pub fn proto(&self) -> Option<&MethodProto> {
        self.proto.as_ref()
    }

    /// Prototype as written, e.g. `(ILjava/lang/String;)V`.
    pub fn proto_text(&self) -> &str {
        &self.proto_text
    }

    /// `name(params)ret`
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, self.proto_text)
    }

    pub fn access(&self) -> AccessFlags {
        self.access
    }

    pub fn is_static(&self) -> bool {
        self.access.contains(AccessFlags::STATIC)
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn is_static_initializer(&self) -> bool {
        self.name == STATIC_INITIALIZER_NAME
    }

    pub fn range(&self) -> Option<Range> {
        self.range
    }

    /// Byte address of the first instruction on or after `line`.
    ///
    /// Only lines inside this method's own range map; a line before the
    /// method, after it, or past its last instruction yields `None`. Methods
    /// rebuilt from a stub carry no instruction table.
    pub fn address_for_line(&self, line: usize) -> Option<u32> {
        let range = self.range?;
        if !range.contains_line(line) {
            return None;
        }
        self.addresses
            .iter()
            .find(|(instr_line, _)| *instr_line >= line)
            .map(|(_, address)| *address)
    }
}

fn address_table(method: &SyntaxNode) -> Vec<(usize, u32)> {
    let mut table = Vec::new();
    let mut units = 0u32;
    for child in method.children() {
        match child.kind() {
            SyntaxKind::Instruction => {
                let opcode = child
                    .find_child(SyntaxKind::Opcode)
                    .map(|op| op.text())
                    .unwrap_or("");
                match instruction_size(opcode) {
                    Some(size) => {
                        table.push((child.range().start_line, units * 2));
                        units += size;
                    }
                    None => trace!(opcode, line = child.range().start_line, "unsized opcode"),
                }
            }
            SyntaxKind::Payload => {
                // payloads start on a 4-byte boundary
                units += units % 2;
                units += payload_size(child);
            }
            _ => {}
        }
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    /// Lines of the class header `method_of` puts before `src`.
    const HEADER_LINES: usize = 2;

    fn method_of(src: &str) -> MethodDecl {
        let file = parse(&format!(
            ".class public Lcom/example/Foo;\n.super Ljava/lang/Object;\n{}",
            src
        ));
        let node = file
            .descendants()
            .find(|n| n.kind() == SyntaxKind::Method)
            .unwrap();
        MethodDecl::from_syntax("com.example.Foo", node).unwrap()
    }

    #[test]
    fn test_method_signature() {
        let m = method_of(".method public static max(II)I\n.end method\n");
        assert_eq!(m.name(), "max");
        assert_eq!(m.signature(), "max(II)I");
        assert!(m.is_static());
        assert_eq!(m.proto().unwrap().params().len(), 2);
    }

    #[test]
    fn test_address_for_line() {
        let src = "\
.method public run()V
    .registers 2
    const/4 v0, 0x1
    const-string v1, \"hi\"

    invoke-static {v1}, Lcom/example/Log;->d(Ljava/lang/String;)V
    return-void
.end method
";
        let m = method_of(src);
        assert_eq!(m.address_for_line(HEADER_LINES), Some(0));
        assert_eq!(m.address_for_line(2 + HEADER_LINES), Some(0));
        assert_eq!(m.address_for_line(3 + HEADER_LINES), Some(2));
        assert_eq!(m.address_for_line(4 + HEADER_LINES), Some(6));
        assert_eq!(m.address_for_line(5 + HEADER_LINES), Some(6));
        assert_eq!(m.address_for_line(6 + HEADER_LINES), Some(12));
        assert_eq!(m.address_for_line(7 + HEADER_LINES), None);
        assert_eq!(m.address_for_line(40 + HEADER_LINES), None);
    }

    #[test]
    fn test_reverse_subtract_is_sized() {
        let src = "\
.method public neg(I)I
    .registers 2
    rsub-int v0, v1, 0x10
    return-void
.end method
";
        let m = method_of(src);
        assert_eq!(m.address_for_line(2 + HEADER_LINES), Some(0));
        assert_eq!(m.address_for_line(3 + HEADER_LINES), Some(4));
    }

    #[test]
    fn test_payload_alignment() {
        let src = "\
.method public run(I)V
    .registers 2
    packed-switch p1, :pswitch_data
    return-void
    :pswitch_data
    .packed-switch 0x0
        :a
    .end packed-switch
.end method
";
        let m = method_of(src);
        assert_eq!(m.address_for_line(2 + HEADER_LINES), Some(0));
        assert_eq!(m.address_for_line(3 + HEADER_LINES), Some(6));
    }

    #[test]
    fn test_field_from_syntax() {
        let file = parse(".class LFoo;\n.super Ljava/lang/Object;\n.field public static final TAG:Ljava/lang/String; = \"x\"\n");
        let node = file
            .descendants()
            .find(|n| n.kind() == SyntaxKind::Field)
            .unwrap();
        let field = FieldDecl::from_syntax("Foo", node).unwrap();
        assert_eq!(field.name(), "TAG");
        assert_eq!(field.type_descriptor(), Some("Ljava/lang/String;"));
        assert!(field.is_static());
        assert_eq!(field.field_type().unwrap().class_name().as_deref(), Some("java.lang.String"));
    }

    #[test]
    fn test_stub_rebuild_drops_addresses() {
        let m = method_of(".method run()V\n    return-void\n.end method\n");
        let rebuilt = MethodDecl::from_stub(m.owner(), &m.to_stub());
        assert_eq!(rebuilt.signature(), m.signature());
        assert_eq!(rebuilt.address_for_line(1 + HEADER_LINES), None);
    }
}
