use crate::error::ApiResult;
use crate::models::{PositionContext, SymbolInfo, SymbolLocation};

// ============================================================================
// Consumer-facing semantic traits
// ============================================================================

/// Name lookup, consumed by completion and import resolution.
pub trait SymbolLookup: Send + Sync {
    /// All class declarations in the project with exactly this qualified name.
    ///
    /// Duplicates are legal; the result lists every candidate in index order.
    fn lookup_by_qualified_name(&self, qualified_name: &str) -> ApiResult<Vec<SymbolInfo>>;

    /// Fields and methods of the first class declared under `qualified_name`.
    fn members_of(&self, qualified_name: &str) -> ApiResult<Vec<SymbolInfo>>;
}

/// Reference navigation, consumed by goto-definition and highlighting.
pub trait SymbolNavigator: Send + Sync {
    /// Resolve the reference under the cursor to its declaration.
    ///
    /// `Ok(None)` means "nothing resolvable here", not an error.
    fn resolve_at(&self, ctx: &PositionContext) -> ApiResult<Option<SymbolLocation>>;
}
