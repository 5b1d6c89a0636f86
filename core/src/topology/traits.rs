use async_trait::async_trait;

use super::types::TopologySnapshot;

#[async_trait]
pub trait TopologyProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> anyhow::Result<TopologySnapshot>;

    /// Releases any client handles. Called once per dispatcher run.
    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
