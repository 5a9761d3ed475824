//! Dalvik instruction sizes, in 16-bit code units.

use crate::syntax::{SyntaxKind, SyntaxNode};

/// Size of the instruction spelled by `opcode`, or `None` for unknown opcodes.
pub fn instruction_size(opcode: &str) -> Option<u32> {
    let exact = match opcode {
        "nop" | "return-void" | "return-void-barrier" | "return-void-no-barrier" => Some(1),
        "move" | "move-wide" | "move-object" | "move-result" | "move-result-wide"
        | "move-result-object" | "move-exception" | "return" | "return-wide"
        | "return-object" | "const/4" | "monitor-enter" | "monitor-exit" | "throw"
        | "array-length" | "goto" => Some(1),
        "move/from16" | "move-wide/from16" | "move-object/from16" | "const/16"
        | "const/high16" | "const-wide/16" | "const-wide/high16" | "const-string"
        | "const-class" | "const-method-handle" | "const-method-type" | "check-cast"
        | "instance-of" | "new-instance" | "new-array" | "goto/16" | "rsub-int" | "cmpl-float"
        | "cmpg-float" | "cmpl-double" | "cmpg-double" | "cmp-long" => Some(2),
        "move/16" | "move-wide/16" | "move-object/16" | "const" | "const-wide/32"
        | "const-string/jumbo" | "goto/32" | "fill-array-data" | "packed-switch"
        | "sparse-switch" | "filled-new-array" | "filled-new-array/range" => Some(3),
        "const-wide" => Some(5),
        _ => None,
    };
    if exact.is_some() {
        return exact;
    }

    if opcode.ends_with("/2addr") {
        return Some(1);
    }
    if opcode.ends_with("/lit8") || opcode.ends_with("/lit16") {
        return Some(2);
    }
    if opcode.starts_with("invoke-polymorphic") {
        return Some(4);
    }
    if opcode.starts_with("invoke-") || opcode.starts_with("execute-inline") {
        return Some(3);
    }
    if opcode.starts_with("if-") {
        return Some(2);
    }
    if ["iget", "iput", "sget", "sput", "aget", "aput"]
        .iter()
        .any(|p| opcode.starts_with(p))
    {
        return Some(2);
    }

    let (op, operand_type) = opcode.rsplit_once('-')?;
    if !matches!(operand_type, "int" | "long" | "float" | "double" | "byte" | "char" | "short") {
        return None;
    }
    match op {
        "neg" | "not" => Some(1),
        _ if op.ends_with("-to") => Some(1),
        "add" | "sub" | "mul" | "div" | "rem" | "and" | "or" | "xor" | "shl" | "shr"
        | "ushr" => Some(2),
        _ => None,
    }
}

/// Size of a payload pseudo-instruction block, excluding alignment padding.
pub fn payload_size(payload: &SyntaxNode) -> u32 {
    let directive = payload
        .children()
        .first()
        .and_then(|header| header.children().first())
        .map(|kw| kw.text())
        .unwrap_or("");
    let entries: Vec<&SyntaxNode> = payload.children_of_kind(SyntaxKind::PayloadEntry).collect();

    match directive {
        ".packed-switch" => {
            let targets = entries
                .iter()
                .flat_map(|e| e.children_of_kind(SyntaxKind::LabelRef))
                .count() as u32;
            targets * 2 + 4
        }
        ".sparse-switch" => entries.len() as u32 * 4 + 2,
        ".array-data" => {
            let width = payload
                .children()
                .first()
                .and_then(|header| header.children().get(1))
                .and_then(|w| parse_int(w.text()))
                .unwrap_or(1);
            let count: u32 = entries.iter().map(|e| e.children().len() as u32).sum();
            (count * width).div_ceil(2) + 4
        }
        _ => 0,
    }
}

fn parse_int(text: &str) -> Option<u32> {
    match text.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::parse;

    #[test]
    fn test_instruction_sizes() {
        assert_eq!(instruction_size("return-void"), Some(1));
        assert_eq!(instruction_size("const/4"), Some(1));
        assert_eq!(instruction_size("const-string"), Some(2));
        assert_eq!(instruction_size("invoke-virtual"), Some(3));
        assert_eq!(instruction_size("invoke-static/range"), Some(3));
        assert_eq!(instruction_size("invoke-polymorphic"), Some(4));
        assert_eq!(instruction_size("const-wide"), Some(5));
        assert_eq!(instruction_size("iget-object"), Some(2));
        assert_eq!(instruction_size("add-int/2addr"), Some(1));
        assert_eq!(instruction_size("add-int/lit8"), Some(2));
        assert_eq!(instruction_size("add-int"), Some(2));
        assert_eq!(instruction_size("int-to-long"), Some(1));
        assert_eq!(instruction_size("neg-double"), Some(1));
        assert_eq!(instruction_size("rsub-int"), Some(2));
        assert_eq!(instruction_size("rsub-int/lit8"), Some(2));
        assert_eq!(instruction_size("frobnicate"), None);
    }

    fn payload_of(src: &str) -> SyntaxNode {
        parse(src)
            .descendants()
            .find(|n| n.kind() == SyntaxKind::Payload)
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_payload_sizes() {
        let packed = payload_of(
            ".method a()V\n.packed-switch 0x1\n:a\n:b\n:c\n.end packed-switch\n.end method\n",
        );
        assert_eq!(payload_size(&packed), 10);

        let sparse = payload_of(
            ".method a()V\n.sparse-switch\n0x1 -> :a\n0x7 -> :b\n.end sparse-switch\n.end method\n",
        );
        assert_eq!(payload_size(&sparse), 10);

        let array = payload_of(
            ".method a()V\n.array-data 4\n0x1\n0x2\n0x3\n.end array-data\n.end method\n",
        );
        assert_eq!(payload_size(&array), 10);
    }
}
