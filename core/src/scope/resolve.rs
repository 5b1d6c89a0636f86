use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigurationError;
use crate::topology::TopologySnapshot;

use super::types::{ScopeSpec, Target};

/// Resolves `spec` against `snapshot`.
///
/// Filters combine with AND across dimensions and OR within one. Zones of a
/// disallowed service are never selected; naming such a service is an error.
/// Explicitly named zones, services and compute nodes must exist.
///
/// The returned targets are sorted by compute node then zone name. Callers
/// that care about presentation order apply their own.
pub fn resolve(
    snapshot: &TopologySnapshot,
    spec: &ScopeSpec,
    disallowed: &BTreeSet<String>,
) -> Result<Vec<Target>, ConfigurationError> {
    spec.validate()?;

    if let Some(services) = spec.services() {
        let known = snapshot.service_names();
        for service in services {
            if disallowed.contains(service) {
                return Err(ConfigurationError::DisallowedService(service.clone()));
            }
            if !known.contains(service.as_str()) {
                return Err(ConfigurationError::UnknownService(service.clone()));
            }
        }
    }

    if let Some(zonenames) = spec.zonenames() {
        if let Some(missing) = zonenames.iter().find(|z| snapshot.zone(z).is_none()) {
            return Err(ConfigurationError::UnknownZone(missing.clone()));
        }
    }

    let node_ids = spec
        .compute_nodes()
        .map(|names| {
            names
                .iter()
                .map(|name| {
                    snapshot
                        .find_compute_node(name)
                        .map(|cn| cn.id.as_str())
                        .ok_or_else(|| ConfigurationError::UnknownComputeNode(name.clone()))
                })
                .collect::<Result<BTreeSet<&str>, _>>()
        })
        .transpose()?;

    let mut targets = Vec::new();
    for zone in snapshot.zones() {
        if disallowed.contains(&zone.service) {
            continue;
        }

        if !spec.all_targets {
            if spec
                .zonenames()
                .is_some_and(|names| !names.contains(&zone.zonename))
            {
                continue;
            }
            if spec
                .services()
                .is_some_and(|names| !names.contains(&zone.service))
            {
                continue;
            }
            if node_ids
                .as_ref()
                .is_some_and(|ids| !ids.contains(zone.compute_node_id.as_str()))
            {
                continue;
            }
        }

        let Some(cn) = snapshot.compute_node(&zone.compute_node_id) else {
            tracing::warn!(
                zonename = %zone.zonename,
                compute_node = %zone.compute_node_id,
                "skipping zone on unknown compute node"
            );
            continue;
        };

        targets.push(Target::zone(
            cn.id.clone(),
            cn.hostname.clone(),
            zone.zonename.clone(),
            zone.service.clone(),
        ));
    }

    if spec.host_context {
        let by_node: BTreeMap<String, Target> = targets
            .into_iter()
            .map(|t| {
                let host = Target::host(t.compute_node_id, t.hostname);
                (host.compute_node_id.clone(), host)
            })
            .collect();
        targets = by_node.into_values().collect();
    }

    if targets.is_empty() {
        return Err(ConfigurationError::NoMatchingTargets);
    }

    targets.sort_by(|a, b| {
        (&a.compute_node_id, &a.zonename).cmp(&(&b.compute_node_id, &b.zonename))
    });
    tracing::debug!(count = targets.len(), "resolved scope");
    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{ComputeNode, ZoneRecord};
    use pretty_assertions::assert_eq;

    fn node(id: &str, hostname: &str) -> ComputeNode {
        ComputeNode {
            id: id.into(),
            hostname: hostname.into(),
            address: None,
        }
    }

    fn zone(zonename: &str, service: &str, cn: &str) -> ZoneRecord {
        ZoneRecord {
            zonename: zonename.into(),
            service: service.into(),
            compute_node_id: cn.into(),
            address: None,
        }
    }

    fn fleet() -> TopologySnapshot {
        TopologySnapshot::new(
            vec![node("cn1", "RA10001"), node("cn2", "RA10002"), node("cn3", "RA10003")],
            vec![
                zone("z1", "svcA", "cn1"),
                zone("z2", "svcA", "cn2"),
                zone("z3", "svcB", "cn1"),
                zone("m1", "marlin", "cn2"),
            ],
        )
    }

    fn disallowed() -> BTreeSet<String> {
        BTreeSet::from(["marlin".to_string()])
    }

    fn zonenames(targets: &[Target]) -> Vec<&str> {
        targets.iter().filter_map(|t| t.zonename.as_deref()).collect()
    }

    #[test]
    fn test_filters_combine_with_and_across_dimensions() {
        let spec = ScopeSpec::default()
            .with_zonenames(["z1", "z3"])
            .with_services(["svcA"]);
        let targets = resolve(&fleet(), &spec, &disallowed()).unwrap();
        assert_eq!(zonenames(&targets), vec!["z1"]);
    }

    #[test]
    fn test_filters_combine_with_or_within_a_dimension() {
        let spec = ScopeSpec::default().with_services(["svcA", "svcB"]);
        let targets = resolve(&fleet(), &spec, &disallowed()).unwrap();
        assert_eq!(zonenames(&targets), vec!["z1", "z3", "z2"]);
    }

    #[test]
    fn test_all_targets_skips_disallowed_service() {
        let targets = resolve(&fleet(), &ScopeSpec::all(), &disallowed()).unwrap();
        assert_eq!(targets.len(), 3);
        assert!(targets.iter().all(|t| t.service.as_deref() != Some("marlin")));
    }

    #[test]
    fn test_naming_disallowed_service_is_an_error() {
        let spec = ScopeSpec::default().with_services(["svcA", "marlin"]);
        assert_eq!(
            resolve(&fleet(), &spec, &disallowed()),
            Err(ConfigurationError::DisallowedService("marlin".into()))
        );
    }

    #[test]
    fn test_disallowed_zone_selected_by_node_is_dropped() {
        let spec = ScopeSpec::default().with_compute_nodes(["cn2"]);
        let targets = resolve(&fleet(), &spec, &disallowed()).unwrap();
        assert_eq!(zonenames(&targets), vec!["z2"]);
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let spec = ScopeSpec::default().with_zonenames(["z1", "nope"]);
        assert_eq!(
            resolve(&fleet(), &spec, &disallowed()),
            Err(ConfigurationError::UnknownZone("nope".into()))
        );

        let spec = ScopeSpec::default().with_compute_nodes(["RA99999"]);
        assert_eq!(
            resolve(&fleet(), &spec, &disallowed()),
            Err(ConfigurationError::UnknownComputeNode("RA99999".into()))
        );

        let spec = ScopeSpec::default().with_services(["svcC"]);
        assert_eq!(
            resolve(&fleet(), &spec, &disallowed()),
            Err(ConfigurationError::UnknownService("svcC".into()))
        );
    }

    #[test]
    fn test_declared_service_without_zones_is_empty_scope() {
        let mut snap = fleet();
        snap.services.push("svcC".into());
        let spec = ScopeSpec::default().with_services(["svcC"]);
        assert_eq!(
            resolve(&snap, &spec, &disallowed()),
            Err(ConfigurationError::NoMatchingTargets)
        );
    }

    #[test]
    fn test_compute_node_matches_hostname() {
        let spec = ScopeSpec::default().with_compute_nodes(["RA10001"]);
        let targets = resolve(&fleet(), &spec, &disallowed()).unwrap();
        assert_eq!(zonenames(&targets), vec!["z1", "z3"]);
    }

    #[test]
    fn test_disjoint_zone_and_node_filters_yield_no_targets() {
        let spec = ScopeSpec::default()
            .with_zonenames(["z2"])
            .with_compute_nodes(["cn1"]);
        assert_eq!(
            resolve(&fleet(), &spec, &disallowed()),
            Err(ConfigurationError::NoMatchingTargets)
        );
    }

    #[test]
    fn test_host_context_collapses_to_one_target_per_node() {
        let spec = ScopeSpec::default()
            .with_services(["svcA", "svcB"])
            .in_host_context();
        let targets = resolve(&fleet(), &spec, &disallowed()).unwrap();
        assert_eq!(
            targets,
            vec![Target::host("cn1", "RA10001"), Target::host("cn2", "RA10002")]
        );
    }

    #[test]
    fn test_invalid_scope_checked_before_topology() {
        let empty = TopologySnapshot::default();
        assert!(matches!(
            resolve(&empty, &ScopeSpec::default(), &disallowed()),
            Err(ConfigurationError::InvalidScope(_))
        ));
    }
}
