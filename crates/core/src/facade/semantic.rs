use crate::error::SmaliscopeError;
use crate::facade::EngineHandle;
use smaliscope_api::error::{ApiError, ApiResult};
use smaliscope_api::models::{PositionContext, SymbolInfo, SymbolLocation};
use smaliscope_api::semantic::{SymbolLookup, SymbolNavigator};
use smaliscope_smali::{Declaration, Resolver};
use std::sync::Arc;

impl From<SmaliscopeError> for ApiError {
    fn from(err: SmaliscopeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl SymbolLookup for EngineHandle {
    fn lookup_by_qualified_name(&self, qualified_name: &str) -> ApiResult<Vec<SymbolInfo>> {
        let candidates = self.engine.index().lookup_by_qualified_name(qualified_name);
        Ok(candidates
            .into_iter()
            .filter_map(|class| self.info_of(&Declaration::Class(class)))
            .collect())
    }

    fn members_of(&self, qualified_name: &str) -> ApiResult<Vec<SymbolInfo>> {
        let owner = self
            .engine
            .index()
            .first_by_qualified_name(qualified_name)
            .ok_or_else(|| ApiError::NotFound(qualified_name.to_string()))?;

        let decl = owner.decl().clone();
        let fields = decl.fields().iter().map(|field| Declaration::Field {
            owner: Arc::clone(&owner),
            field: Arc::clone(field),
        });
        let methods = decl.methods().iter().map(|method| Declaration::Method {
            owner: Arc::clone(&owner),
            method: Arc::clone(method),
        });

        Ok(fields
            .chain(methods)
            .filter_map(|member| self.info_of(&member))
            .collect())
    }
}

impl SymbolNavigator for EngineHandle {
    fn resolve_at(&self, ctx: &PositionContext) -> ApiResult<Option<SymbolLocation>> {
        let tree = self.engine.parse_file(&ctx.path)?;
        let resolved = Resolver::new(self.engine.index()).resolve_at(&tree, ctx.line, ctx.col);
        Ok(resolved.and_then(|decl| self.location_of(&decl)))
    }
}
