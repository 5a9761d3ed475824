pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod files;
pub mod logging;
pub mod registry;
pub mod scanner;
pub mod store;
pub mod watch;

pub use config::EngineConfig;
pub use engine::{IndexStats, SmaliscopeEngine, SmaliscopeEngineBuilder};
pub use error::{Result, SmaliscopeError};
pub use facade::EngineHandle;
pub use registry::ProjectRegistry;
