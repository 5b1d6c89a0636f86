#[allow(clippy::module_inception)]
pub mod error;
pub mod dispatch;

pub use dispatch::{ConfigurationError, DispatchError};
pub use error::CliError;
