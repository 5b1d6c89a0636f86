//! Fleet topology: which zones exist, which service each runs, and which
//! compute node hosts it.
//!
//! The snapshot is produced by a [`TopologyProvider`]; discovering the fleet
//! is the provider's business, the executor only consumes the snapshot.

mod traits;
mod types;

pub use traits::TopologyProvider;
pub use types::{ComputeNode, TopologySnapshot, ZoneRecord};
