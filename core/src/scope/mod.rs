//! Turning a scope selection into concrete execution targets.

mod resolve;
mod types;

pub use resolve::resolve;
pub use types::{ScopeSpec, Target};
