//! Preparing user input for remote execution: wrapping a command so it runs
//! inside a zone, and checking transfer paths against the zone's root.

mod path;
mod wrap;

pub use path::{normalize, validate, zone_path, zone_root, ZONES_ROOT, ZONE_ROOT_MARKER};
pub use wrap::{check_script, wrap, SCRIPT_DELIMITER};
