use thiserror::Error;

use super::dispatch::DispatchError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Dispatch(#[from] DispatchError),
    #[error("usage error: {0}")]
    Usage(String),
    #[error("config error: {0}")]
    Config(String),
    #[error("output error: {0}")]
    Output(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}
