//! Local host self-introspection, used to pick the address remote nodes
//! should reach this host on during file transfers.

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalIdentity {
    /// Running inside a zone with this name.
    Zone(String),
    /// Running in the global zone of the compute node with this server UUID.
    Host(String),
}

#[async_trait]
pub trait IdentityProbe: Send + Sync {
    async fn identify(&self) -> anyhow::Result<LocalIdentity>;
}
