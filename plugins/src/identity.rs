//! Works out where this process runs: inside a zone, or in the global zone
//! of a compute node.

use anyhow::{Context, Result};
use async_trait::async_trait;
use oneach_core::api::{IdentityProbe, LocalIdentity};
use serde_json::Value;
use tokio::process::Command;

const GLOBAL_ZONE: &str = "global";

pub struct SystemIdentityProbe {
    zonename_program: String,
    sysinfo_program: String,
}

impl SystemIdentityProbe {
    pub fn new() -> Self {
        Self {
            zonename_program: "zonename".into(),
            sysinfo_program: "sysinfo".into(),
        }
    }

    pub fn with_programs(zonename: impl Into<String>, sysinfo: impl Into<String>) -> Self {
        Self {
            zonename_program: zonename.into(),
            sysinfo_program: sysinfo.into(),
        }
    }
}

impl Default for SystemIdentityProbe {
    fn default() -> Self {
        Self::new()
    }
}

async fn capture(program: &str) -> Result<String> {
    let path = which::which(program).with_context(|| format!("cannot find {}", program))?;
    let output = Command::new(&path)
        .output()
        .await
        .with_context(|| format!("failed to run {}", program))?;
    if !output.status.success() {
        anyhow::bail!(
            "{} exited with {}: {}",
            program,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Extracts the server UUID from `sysinfo` JSON output.
pub fn parse_sysinfo_uuid(raw: &str) -> Result<String> {
    let value: Value = serde_json::from_str(raw).context("sysinfo output is not JSON")?;
    value
        .get("UUID")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
        .context("sysinfo output has no UUID")
}

#[async_trait]
impl IdentityProbe for SystemIdentityProbe {
    async fn identify(&self) -> Result<LocalIdentity> {
        let zonename = capture(&self.zonename_program).await?;
        let zonename = zonename.trim();
        if zonename.is_empty() {
            anyhow::bail!("{} printed nothing", self.zonename_program);
        }
        if zonename != GLOBAL_ZONE {
            return Ok(LocalIdentity::Zone(zonename.to_string()));
        }

        let sysinfo = capture(&self.sysinfo_program).await?;
        let uuid = parse_sysinfo_uuid(&sysinfo)?;
        tracing::debug!(server_uuid = %uuid, "running in the global zone");
        Ok(LocalIdentity::Host(uuid))
    }
}
