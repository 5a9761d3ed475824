pub mod error;
pub mod models;
pub mod semantic;

// Re-export commonly used types
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use semantic::{SymbolLookup, SymbolNavigator};
