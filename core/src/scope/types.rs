use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::transport::RemoteNode;

/// One execution unit. `zonename` and `service` are absent when the run
/// targets the compute node itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Target {
    pub compute_node_id: String,
    pub hostname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zonename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Target {
    pub fn zone(
        compute_node_id: impl Into<String>,
        hostname: impl Into<String>,
        zonename: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            compute_node_id: compute_node_id.into(),
            hostname: hostname.into(),
            zonename: Some(zonename.into()),
            service: Some(service.into()),
        }
    }

    pub fn host(compute_node_id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            compute_node_id: compute_node_id.into(),
            hostname: hostname.into(),
            zonename: None,
            service: None,
        }
    }

    pub fn is_host_context(&self) -> bool {
        self.zonename.is_none()
    }

    /// Zone name, or hostname in host context. Used to name pulled files.
    pub fn label(&self) -> &str {
        self.zonename.as_deref().unwrap_or(&self.hostname)
    }

    pub fn remote_node(&self) -> RemoteNode {
        RemoteNode {
            id: self.compute_node_id.clone(),
            hostname: self.hostname.clone(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.zonename, &self.service) {
            (Some(zone), Some(svc)) => write!(f, "{} ({}) on {}", zone, svc, self.hostname),
            (Some(zone), None) => write!(f, "{} on {}", zone, self.hostname),
            _ => write!(f, "{} ({})", self.hostname, self.compute_node_id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSpec {
    pub all_targets: bool,
    pub zonenames: Option<BTreeSet<String>>,
    pub services: Option<BTreeSet<String>>,
    /// Compute nodes by server UUID or hostname.
    pub compute_nodes: Option<BTreeSet<String>>,
    pub host_context: bool,
}

fn non_empty(set: &Option<BTreeSet<String>>) -> Option<&BTreeSet<String>> {
    set.as_ref().filter(|s| !s.is_empty())
}

fn to_set<I, S>(items: I) -> Option<BTreeSet<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Some(items.into_iter().map(Into::into).collect())
}

impl ScopeSpec {
    pub fn all() -> Self {
        Self {
            all_targets: true,
            ..Self::default()
        }
    }

    pub fn with_zonenames<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zonenames = to_set(items);
        self
    }

    pub fn with_services<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.services = to_set(items);
        self
    }

    pub fn with_compute_nodes<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.compute_nodes = to_set(items);
        self
    }

    pub fn in_host_context(mut self) -> Self {
        self.host_context = true;
        self
    }

    pub fn zonenames(&self) -> Option<&BTreeSet<String>> {
        non_empty(&self.zonenames)
    }

    pub fn services(&self) -> Option<&BTreeSet<String>> {
        non_empty(&self.services)
    }

    pub fn compute_nodes(&self) -> Option<&BTreeSet<String>> {
        non_empty(&self.compute_nodes)
    }

    pub fn has_filters(&self) -> bool {
        self.zonenames().is_some() || self.services().is_some() || self.compute_nodes().is_some()
    }

    /// Exactly one of "all targets" or a non-empty filter must be selected.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match (self.all_targets, self.has_filters()) {
            (true, false) | (false, true) => Ok(()),
            (true, true) => Err(ConfigurationError::InvalidScope(
                "\"all targets\" cannot be combined with zone, service or compute node filters"
                    .into(),
            )),
            (false, false) => Err(ConfigurationError::InvalidScope(
                "select all targets or at least one zone, service or compute node".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_exactly_one_selection_mode() {
        assert!(ScopeSpec::all().validate().is_ok());
        assert!(ScopeSpec::default().with_services(["webapi"]).validate().is_ok());
        assert!(ScopeSpec::default()
            .with_zonenames(["z1"])
            .with_compute_nodes(["cn1"])
            .in_host_context()
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_both_and_neither() {
        assert!(matches!(
            ScopeSpec::all().with_zonenames(["z1"]).validate(),
            Err(ConfigurationError::InvalidScope(_))
        ));
        assert!(matches!(
            ScopeSpec::default().validate(),
            Err(ConfigurationError::InvalidScope(_))
        ));
        assert!(matches!(
            ScopeSpec::default().in_host_context().validate(),
            Err(ConfigurationError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_empty_filter_sets_count_as_absent() {
        let spec = ScopeSpec::default().with_services(Vec::<String>::new());
        assert!(!spec.has_filters());
        assert!(spec.validate().is_err());

        let spec = ScopeSpec::all().with_zonenames(Vec::<String>::new());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn test_target_label_and_display() {
        let zone = Target::zone("cn1", "RA10001", "z1", "webapi");
        assert_eq!(zone.label(), "z1");
        assert_eq!(zone.to_string(), "z1 (webapi) on RA10001");

        let host = Target::host("cn1", "RA10001");
        assert!(host.is_host_context());
        assert_eq!(host.label(), "RA10001");
        assert_eq!(host.remote_node().id, "cn1");
    }
}
