use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use oneach_core::api::{TopologyProvider, TopologySnapshot};

/// Loads the fleet layout from a JSON snapshot on disk.
///
/// ```json
/// {
///   "compute_nodes": [{"id": "cn1", "hostname": "RA10001", "address": "10.0.0.1"}],
///   "zones": [{"zonename": "z1", "service": "webapi", "compute_node_id": "cn1"}],
///   "services": ["webapi"]
/// }
/// ```
pub struct FileTopologyProvider {
    path: PathBuf,
}

impl FileTopologyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TopologyProvider for FileTopologyProvider {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self) -> Result<TopologySnapshot> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read topology snapshot {}", self.path.display()))?;
        let snapshot: TopologySnapshot = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse topology snapshot {}", self.path.display()))?;
        snapshot
            .validate()
            .with_context(|| format!("invalid topology snapshot {}", self.path.display()))?;

        tracing::debug!(
            path = %self.path.display(),
            zones = snapshot.zones.len(),
            compute_nodes = snapshot.compute_nodes.len(),
            "read topology snapshot"
        );
        Ok(snapshot)
    }
}
