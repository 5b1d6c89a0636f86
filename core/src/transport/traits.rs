use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::TransportConfig;

use super::types::{ConnectOptions, ExecOutput, RemoteNode};

#[async_trait]
pub trait TransportConnector: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(
        &self,
        config: &TransportConfig,
        options: &ConnectOptions,
    ) -> anyhow::Result<Box<dyn Transport>>;
}

/// Operations against a single compute node. `timeout` is advisory for the
/// implementation; callers bound their own wait independently.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn exec(
        &self,
        node: &RemoteNode,
        script: &str,
        timeout: Duration,
    ) -> anyhow::Result<ExecOutput>;

    /// Copies `local_path` into the directory `remote_dir` on the node.
    async fn push(
        &self,
        node: &RemoteNode,
        local_path: &Path,
        remote_dir: &str,
        clobber: bool,
        timeout: Duration,
    ) -> anyhow::Result<()>;

    /// Copies `remote_file` from the node to `local_dir/local_name`.
    async fn pull(
        &self,
        node: &RemoteNode,
        remote_file: &str,
        local_dir: &Path,
        local_name: &str,
        timeout: Duration,
    ) -> anyhow::Result<()>;

    async fn close(&self) -> anyhow::Result<()>;
}
