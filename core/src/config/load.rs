use std::path::{Path, PathBuf};

use super::types::AppConfig;

/// Get the default oneach data directory: ~/.oneach
pub fn get_oneach_data_dir() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".oneach"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.oneach/config.toml (highest)
    let oneach_config = get_oneach_data_dir()?.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg = if oneach_config.exists() {
        load_from_path(&oneach_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    Ok(apply_env_overrides(cfg, |key| std::env::var(key).ok()))
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("read {}: {}", path.display(), e))?;
    let cfg = toml::from_str::<AppConfig>(&s)
        .map_err(|e| anyhow::anyhow!("parse {}: {}", path.display(), e))?;
    Ok(cfg)
}

/// Environment variable overrides (highest priority).
pub fn apply_env_overrides<F>(mut cfg: AppConfig, lookup: F) -> AppConfig
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = non_empty("ONEACH_TOPOLOGY_FILE") {
        cfg.topology.snapshot_path = v;
    }
    if let Some(v) = non_empty("ONEACH_SSH_USER") {
        cfg.transport.user = v;
    }
    if let Some(v) = non_empty("ONEACH_LOG_LEVEL") {
        cfg.logging.level = v;
    }

    cfg
}

/// Expands `~` and environment references in the configured snapshot path.
pub fn resolve_snapshot_path(cfg: &AppConfig) -> anyhow::Result<PathBuf> {
    let expanded = shellexpand::full(&cfg.topology.snapshot_path)
        .map_err(|e| anyhow::anyhow!("expand {}: {}", cfg.topology.snapshot_path, e))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_path_reads_sections() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[dispatch]
concurrency = 3
exec_timeout_secs = 5

[topology]
snapshot_path = "/var/tmp/topology.json"
"#
        )
        .unwrap();

        let cfg = load_from_path(file.path()).unwrap();
        assert_eq!(cfg.dispatch.concurrency, 3);
        assert_eq!(cfg.dispatch.exec_timeout_secs, 5);
        assert_eq!(cfg.topology.snapshot_path, "/var/tmp/topology.json");
        assert_eq!(cfg.dispatch.connect_timeout_secs, 10);
    }

    #[test]
    fn test_load_from_path_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[dispatch]\nconcurrency = \"many\"").unwrap();
        let err = load_from_path(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_env_overrides_ignore_blank_values() {
        let cfg = apply_env_overrides(AppConfig::default(), |key| match key {
            "ONEACH_SSH_USER" => Some("admin".to_string()),
            "ONEACH_TOPOLOGY_FILE" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.transport.user, "admin");
        assert_eq!(cfg.topology.snapshot_path, "~/.oneach/topology.json");
    }

    #[test]
    fn test_resolve_snapshot_path_keeps_absolute_paths() {
        let mut cfg = AppConfig::default();
        cfg.topology.snapshot_path = "/opt/fleet/topology.json".into();
        assert_eq!(
            resolve_snapshot_path(&cfg).unwrap(),
            PathBuf::from("/opt/fleet/topology.json")
        );
    }
}
