pub mod naming;
pub mod symbol;

pub use naming::*;
pub use symbol::*;
