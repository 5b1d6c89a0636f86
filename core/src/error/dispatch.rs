use thiserror::Error;

/// Operator-facing errors raised before any transport operation is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("service \"{0}\" may not be operated on with this tool")]
    DisallowedService(String),

    #[error("unknown service: \"{0}\"")]
    UnknownService(String),

    #[error("unknown zone: \"{0}\"")]
    UnknownZone(String),

    #[error("unknown compute node: \"{0}\"")]
    UnknownComputeNode(String),

    #[error("no matching targets")]
    NoMatchingTargets,

    #[error("unsupported command: script may not contain \"{delimiter}\"")]
    UnsupportedCommand { delimiter: &'static str },

    #[error("path \"{path}\" is not inside the root of zone {zonename}")]
    InvalidPath { path: String, zonename: String },

    #[error("cannot determine bind address: {0}")]
    BindAddress(String),

    #[error("invalid transport configuration: {0}")]
    Transport(String),

    #[error("{0}")]
    Invalid(String),
}

/// Fatal errors that end a dispatcher run before any result is produced.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigurationError),

    #[error("failed to load topology: {0}")]
    Topology(String),

    #[error("failed to connect transport: {0}")]
    TransportConnect(String),

    #[error("transport connect timed out after {0}s")]
    TransportConnectTimeout(u64),

    #[error("worker failed: {0}")]
    Worker(String),
}
