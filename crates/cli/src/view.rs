use smaliscope_api::models::{SymbolInfo, SymbolLocation};
use tabled::Tabled;

/// A terminal view of one symbol.
#[derive(Tabled)]
pub struct SymbolView {
    pub kind: String,
    pub name: String,
    pub signature: String,
    pub location: String,
    pub fqn: String,
}

impl SymbolView {
    pub fn from_info(info: &SymbolInfo) -> Self {
        Self {
            kind: info.kind.to_string(),
            name: info.name.clone(),
            signature: info.signature.clone().unwrap_or_else(|| "-".to_string()),
            location: format_location(&info.location),
            fqn: shorten_fqn(&info.location.fqn),
        }
    }
}

/// `File.smali:LINE`, 1-based.
pub fn format_location(location: &SymbolLocation) -> String {
    let filename = location
        .path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("-");
    match location.range {
        Some(range) => format!("{}:{}", filename, range.start_line + 1),
        None => filename.to_string(),
    }
}

/// Abbreviate the package of a qualified name: `c.e.Foo->run()V`.
pub fn shorten_fqn(fqn: &str) -> String {
    let (type_part, member) = match fqn.split_once("->") {
        Some((owner, member)) => (owner, Some(member)),
        None => (fqn, None),
    };

    let parts: Vec<&str> = type_part.split('.').collect();
    let mut result = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i + 1 < parts.len() {
            if let Some(c) = part.chars().next() {
                result.push(c);
                result.push('.');
            }
        } else {
            result.push_str(part);
        }
    }

    if let Some(member) = member {
        result.push_str("->");
        result.push_str(member);
    }
    result
}
