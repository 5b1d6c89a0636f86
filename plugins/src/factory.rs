use std::sync::Arc;

use anyhow::Result;

use oneach_core::api::{
    resolve_snapshot_path, AppConfig, ConfigurationError, IdentityProbe, ResultFormatter,
    TopologyProvider, TransportConnector,
};

use crate::formatters::{JsonlFormatter, TextFormatter, TextFormatterConfig};
use crate::identity::SystemIdentityProbe;
use crate::topology::FileTopologyProvider;
use crate::transport::SshConnector;

pub fn build_topology(cfg: &AppConfig) -> Result<Arc<dyn TopologyProvider>> {
    let path = resolve_snapshot_path(cfg)?;
    Ok(Arc::new(FileTopologyProvider::new(path)))
}

pub fn build_connector() -> Arc<dyn TransportConnector> {
    Arc::new(SshConnector::new())
}

pub fn build_identity() -> Arc<dyn IdentityProbe> {
    Arc::new(SystemIdentityProbe::new())
}

pub fn build_formatter(
    format: &str,
    text: TextFormatterConfig,
) -> Result<Box<dyn ResultFormatter>, ConfigurationError> {
    match format {
        "jsonl" => Ok(Box::new(JsonlFormatter::new())),
        "text" => Ok(Box::new(TextFormatter::new(text)?)),
        other => Err(ConfigurationError::Invalid(format!(
            "unknown output format \"{}\"",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatters::LineMode;

    #[test]
    fn test_build_formatter_by_name() {
        let f = build_formatter("jsonl", TextFormatterConfig::default()).unwrap();
        assert_eq!(f.format(), "jsonl");

        let f = build_formatter("text", TextFormatterConfig::default()).unwrap();
        assert_eq!(f.format(), "text");
        assert!(!f.supports_streaming());

        let streaming_auto = TextFormatterConfig {
            batched: false,
            line_mode: LineMode::Auto,
            ..Default::default()
        };
        assert!(build_formatter("text", streaming_auto).is_err());
    }

    #[test]
    fn test_unknown_formatter_is_rejected() {
        let result = build_formatter("yaml", TextFormatterConfig::default());
        assert!(matches!(result, Err(ConfigurationError::Invalid(msg)) if msg.contains("yaml")));
    }

    #[test]
    fn test_build_topology_expands_snapshot_path() {
        let mut cfg = AppConfig::default();
        cfg.topology.snapshot_path = "/srv/oneach/topology.json".into();
        let provider = build_topology(&cfg).unwrap();
        assert_eq!(provider.name(), "file");
    }
}
