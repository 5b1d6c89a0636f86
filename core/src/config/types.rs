use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Service that is never a valid target, whatever the configuration says.
pub const ALWAYS_DISALLOWED_SERVICE: &str = "marlin";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub topology: TopologyConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_enabled")]
    pub enabled: bool,

    /// If true, log to stderr.
    #[serde(default = "default_logging_console")]
    pub console: bool,

    /// If true, log to a file under `directory` (or OS temp dir if unset).
    #[serde(default)]
    pub file: bool,

    /// EnvFilter string, e.g. "warn" or "oneach_core=debug".
    #[serde(default = "default_logging_level")]
    pub level: String,

    /// Optional directory for log files. If empty or unset, uses OS temp dir.
    #[serde(default)]
    pub directory: Option<String>,
}

fn default_logging_enabled() -> bool {
    true
}

fn default_logging_console() -> bool {
    true
}

fn default_logging_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: default_logging_enabled(),
            console: default_logging_console(),
            file: false,
            level: default_logging_level(),
            directory: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Maximum number of operations outstanding at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Per-operation timeout.
    #[serde(default = "default_exec_timeout_secs")]
    pub exec_timeout_secs: u64,

    /// Timeout for establishing the transport.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Extra services to refuse, on top of the built-in one.
    #[serde(default)]
    pub disallowed_services: Vec<String>,

    /// Local address used for file transfers. Probed when unset.
    #[serde(default)]
    pub bind_ip: Option<String>,
}

fn default_concurrency() -> usize {
    10
}

fn default_exec_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            exec_timeout_secs: default_exec_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            disallowed_services: Vec::new(),
            bind_ip: None,
        }
    }
}

impl DispatchConfig {
    /// Configured disallowed services plus the built-in one, deduplicated.
    pub fn disallowed_services(&self) -> std::collections::BTreeSet<String> {
        let mut set: std::collections::BTreeSet<String> = self
            .disallowed_services
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        set.insert(ALWAYS_DISALLOWED_SERVICE.to_string());
        set
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// JSON topology snapshot consumed by the file provider. `~` is expanded.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
}

fn default_snapshot_path() -> String {
    "~/.oneach/topology.json".to_string()
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransportConfig {
    #[serde(default = "default_ssh_program")]
    pub ssh_program: String,

    #[serde(default = "default_scp_program")]
    pub scp_program: String,

    /// Remote login user.
    #[serde(default = "default_user")]
    pub user: String,

    /// Extra `-o` style options passed verbatim to both programs.
    #[serde(default = "default_transport_options")]
    pub options: Vec<String>,
}

fn default_ssh_program() -> String {
    "ssh".to_string()
}

fn default_scp_program() -> String {
    "scp".to_string()
}

fn default_user() -> String {
    "root".to_string()
}

fn default_transport_options() -> Vec<String> {
    vec!["-o".to_string(), "BatchMode=yes".to_string()]
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ssh_program: default_ssh_program(),
            scp_program: default_scp_program(),
            user: default_user(),
            options: default_transport_options(),
        }
    }
}

impl TransportConfig {
    /// Checks the settings a connector relies on and returns a trimmed copy.
    pub fn resolve(&self) -> Result<TransportConfig, ConfigurationError> {
        let ssh_program = self.ssh_program.trim();
        if ssh_program.is_empty() {
            return Err(ConfigurationError::Transport(
                "ssh_program must not be empty".into(),
            ));
        }
        let scp_program = self.scp_program.trim();
        if scp_program.is_empty() {
            return Err(ConfigurationError::Transport(
                "scp_program must not be empty".into(),
            ));
        }
        let user = self.user.trim();
        if user.is_empty() || user.contains(char::is_whitespace) || user.contains('@') {
            return Err(ConfigurationError::Transport(format!(
                "invalid user \"{}\"",
                self.user
            )));
        }

        Ok(TransportConfig {
            ssh_program: ssh_program.to_string(),
            scp_program: scp_program.to_string(),
            user: user.to_string(),
            options: self.options.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_parse_from_empty_toml() {
        let cfg: AppConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.dispatch.concurrency, 10);
        assert_eq!(cfg.dispatch.exec_timeout_secs, 60);
        assert_eq!(cfg.transport.user, "root");
        assert!(cfg.logging.console);
    }

    #[test]
    fn test_builtin_disallowed_service_cannot_be_removed() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [dispatch]
            disallowed_services = ["  ", "storage"]
            "#,
        )
        .unwrap();
        let set = cfg.dispatch.disallowed_services();
        assert!(set.contains("marlin"));
        assert!(set.contains("storage"));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_transport_resolve_rejects_bad_user() {
        let cfg = TransportConfig {
            user: "root@host".into(),
            ..TransportConfig::default()
        };
        assert!(matches!(
            cfg.resolve(),
            Err(ConfigurationError::Transport(_))
        ));

        let ok = TransportConfig {
            ssh_program: " ssh ".into(),
            ..TransportConfig::default()
        }
        .resolve()
        .unwrap();
        assert_eq!(ok.ssh_program, "ssh");
    }
}
