//! Conversions between smali type descriptors and dotted qualified names.

/// Separator used between packages and between package/class.
pub const TYPE_SEPARATOR: char = '.';

/// Separator inside an object type descriptor (`Lcom/example/Foo;`).
pub const DESCRIPTOR_SEPARATOR: char = '/';

/// Separator used between a type and its members in rendered FQNs.
pub const MEMBER_SEPARATOR: &str = "->";

/// Convert an object type descriptor to a qualified name.
///
/// Returns `None` unless the input is exactly `L<internal-name>;` with a
/// non-empty internal name.
///
/// # Examples
/// ```ignore
/// descriptor_to_qualified_name("Lcom/example/Foo;") => Some("com.example.Foo")
/// descriptor_to_qualified_name("I") => None
/// ```
pub fn descriptor_to_qualified_name(descriptor: &str) -> Option<String> {
    let inner = descriptor.strip_prefix('L')?.strip_suffix(';')?;
    if inner.is_empty() || inner.contains(';') {
        return None;
    }
    Some(inner.replace(DESCRIPTOR_SEPARATOR, "."))
}

/// Inverse of [`descriptor_to_qualified_name`].
pub fn qualified_name_to_descriptor(qualified_name: &str) -> String {
    format!("L{};", qualified_name.replace(TYPE_SEPARATOR, "/"))
}

/// Simple name: everything after the last `.`, or the whole name.
pub fn simple_name(qualified_name: &str) -> &str {
    match qualified_name.rfind(TYPE_SEPARATOR) {
        Some(pos) => &qualified_name[pos + 1..],
        None => qualified_name,
    }
}

/// Package: everything before the last `.`, or `""`.
pub fn package_name(qualified_name: &str) -> &str {
    match qualified_name.rfind(TYPE_SEPARATOR) {
        Some(pos) => &qualified_name[..pos],
        None => "",
    }
}

pub fn build_member_fqn(type_fqn: &str, member_name: &str) -> String {
    format!("{}{}{}", type_fqn, MEMBER_SEPARATOR, member_name)
}
