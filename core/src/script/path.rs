//! Zone-root path checks for file transfers.
//!
//! These checks catch operator typos such as a transfer path that climbs out
//! of the zone with `..`. They are not a security boundary: a symlink inside
//! the zone's filesystem can still point anywhere on the host, and that can
//! only be known on the remote side at transfer time.

use crate::error::ConfigurationError;

pub const ZONES_ROOT: &str = "/zones";
pub const ZONE_ROOT_MARKER: &str = "root";

/// `/zones/<zonename>/root`
pub fn zone_root(zonename: &str) -> String {
    format!("{}/{}/{}", ZONES_ROOT, zonename, ZONE_ROOT_MARKER)
}

/// Maps a path as seen from inside the zone to the host-level path.
pub fn zone_path(zonename: &str, path: &str) -> String {
    normalize(&format!("{}/{}", zone_root(zonename), path))
}

/// Lexically normalises an absolute path: collapses repeated separators,
/// drops `.` and resolves `..` without touching the filesystem.
pub fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

pub fn validate(resolved_path: &str, zonename: &str) -> Result<(), ConfigurationError> {
    let normalized = normalize(resolved_path);
    let root = zone_root(zonename);
    let inside = normalized == root
        || normalized
            .strip_prefix(&root)
            .is_some_and(|rest| rest.starts_with('/'));

    if inside {
        Ok(())
    } else {
        Err(ConfigurationError::InvalidPath {
            path: resolved_path.to_string(),
            zonename: zonename.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_inside_zone_root() {
        assert!(validate("/zones/z1/root/etc/foo", "z1").is_ok());
        assert!(validate("/zones/z1/root", "z1").is_ok());
        assert!(matches!(
            validate("/zones/z1/root/etc/foo", "z2"),
            Err(ConfigurationError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_path_escaping_with_dotdot_is_rejected() {
        assert!(validate("/zones/z1/root/../../z2/root/etc", "z1").is_err());
        assert!(validate("/zones/z1/root/var/../etc/./passwd", "z1").is_ok());
    }

    #[test]
    fn test_prefix_must_end_at_component_boundary() {
        assert!(validate("/zones/z1/rootfs/etc", "z1").is_err());
        assert!(validate("/zones/z10/root/etc", "z1").is_err());
    }

    #[test]
    fn test_zone_path_joins_and_normalizes() {
        assert_eq!(zone_path("z1", "/var/tmp/"), "/zones/z1/root/var/tmp");
        assert_eq!(zone_path("z1", "var//log"), "/zones/z1/root/var/log");
        assert_eq!(zone_path("z1", "../../../etc"), "/etc");
    }

    #[test]
    fn test_normalize_never_climbs_above_root() {
        assert_eq!(normalize("/../.."), "/");
        assert_eq!(normalize("//a/./b/../c"), "/a/c");
    }
}
