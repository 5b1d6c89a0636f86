use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

/// A physical host (or hypervisor) that hosts zero or more zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeNode {
    /// Server UUID.
    pub id: String,
    pub hostname: String,
    /// Admin network address, used when this host is the local end of a transfer.
    #[serde(default)]
    pub address: Option<String>,
}

/// One zone running a single service instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub zonename: String,
    pub service: String,
    pub compute_node_id: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub compute_nodes: Vec<ComputeNode>,

    #[serde(default)]
    pub zones: Vec<ZoneRecord>,

    /// Services known to the registry, including ones with no deployed zones.
    #[serde(default)]
    pub services: Vec<String>,
}

impl TopologySnapshot {
    pub fn new(compute_nodes: Vec<ComputeNode>, zones: Vec<ZoneRecord>) -> Self {
        Self {
            compute_nodes,
            zones,
            services: Vec::new(),
        }
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneRecord> {
        self.zones.iter()
    }

    pub fn zone(&self, zonename: &str) -> Option<&ZoneRecord> {
        self.zones.iter().find(|z| z.zonename == zonename)
    }

    pub fn compute_node(&self, id: &str) -> Option<&ComputeNode> {
        self.compute_nodes.iter().find(|cn| cn.id == id)
    }

    /// Looks a compute node up by server UUID first, then by hostname.
    pub fn find_compute_node(&self, id_or_hostname: &str) -> Option<&ComputeNode> {
        self.compute_node(id_or_hostname).or_else(|| {
            self.compute_nodes
                .iter()
                .find(|cn| cn.hostname == id_or_hostname)
        })
    }

    /// Declared services plus every service that has at least one zone.
    pub fn service_names(&self) -> BTreeSet<&str> {
        self.services
            .iter()
            .map(String::as_str)
            .chain(self.zones.iter().map(|z| z.service.as_str()))
            .collect()
    }

    pub fn zone_address(&self, zonename: &str) -> Option<&str> {
        self.zone(zonename).and_then(|z| z.address.as_deref())
    }

    pub fn compute_node_address(&self, id: &str) -> Option<&str> {
        self.compute_node(id).and_then(|cn| cn.address.as_deref())
    }

    /// Checks internal consistency: unique ids and no dangling zone references.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut node_ids = HashSet::new();
        for cn in &self.compute_nodes {
            if cn.id.trim().is_empty() {
                anyhow::bail!("compute node with empty id (hostname {})", cn.hostname);
            }
            if !node_ids.insert(cn.id.as_str()) {
                anyhow::bail!("duplicate compute node id: {}", cn.id);
            }
        }

        let mut zonenames = HashSet::new();
        for zone in &self.zones {
            if !zonenames.insert(zone.zonename.as_str()) {
                anyhow::bail!("duplicate zone: {}", zone.zonename);
            }
            if !node_ids.contains(zone.compute_node_id.as_str()) {
                anyhow::bail!(
                    "zone {} references unknown compute node {}",
                    zone.zonename,
                    zone.compute_node_id
                );
            }
        }

        Ok(())
    }
}
