//! Stable re-exports for consumers (`cli`, `plugins`, and external crates).
//!
//! Prefer importing from `oneach_core::api` instead of reaching into internal modules.

pub use crate::config::{
    apply_env_overrides, load_default, load_from_path, resolve_snapshot_path, AppConfig,
    DispatchConfig, LoggingConfig, TopologyConfig, TransportConfig, ALWAYS_DISALLOWED_SERVICE,
};
pub use crate::error::{CliError, ConfigurationError, DispatchError};
pub use crate::executor::{
    drive_formatter, DispatchOptions, DispatchState, Dispatcher, DispatcherBuilder,
    ExecutionRequest, ExecutionResult, FailureKind, OperationKind, Outcome, ProgressMonitor,
    ResultFormatter, RunEvent, RunSummary,
};
pub use crate::identity::{IdentityProbe, LocalIdentity};
pub use crate::scope::{ScopeSpec, Target};
pub use crate::topology::{ComputeNode, TopologyProvider, TopologySnapshot, ZoneRecord};
pub use crate::transport::{
    ConnectOptions, ExecOutput, RemoteNode, Transport, TransportConnector, REBOOT_EXIT_STATUS,
};
