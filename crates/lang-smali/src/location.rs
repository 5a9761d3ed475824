//! Source line to runtime code location, for debugger hosts.
//!
//! The index supplies the per-method half: which method covers a line and
//! the byte address of the first instruction at or after it. The host's
//! reflection API supplies the runtime methods and their locations.

use crate::model::ClassDecl;

/// A method of a loaded runtime type.
pub trait RuntimeMethod {
    type Location;

    /// Location of a code index (in 16-bit code units).
    fn location_of_code_index(&self, code_index: u64) -> Option<Self::Location>;
}

/// A loaded runtime type, as seen through the host's reflection API.
pub trait RuntimeType {
    type Method: RuntimeMethod;

    /// Methods named `name` whose signature is `signature` (`(I)V`).
    fn methods_by_name(&self, name: &str, signature: &str) -> Vec<Self::Method>;
}

impl ClassDecl {
    /// Runtime location of `line` in this class.
    ///
    /// Methods are tried in declaration order; the first one that both
    /// covers the line and exists on the runtime type answers.
    pub fn location_for_line<R: RuntimeType>(
        &self,
        runtime: &R,
        line: usize,
    ) -> Option<<R::Method as RuntimeMethod>::Location> {
        self.methods().iter().find_map(|method| {
            let address = method.address_for_line(line)?;
            let candidates = runtime.methods_by_name(method.name(), method.proto_text());
            let runtime_method = candidates.first()?;
            runtime_method.location_of_code_index(u64::from(address / 2))
        })
    }
}
