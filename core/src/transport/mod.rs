//! Remote-execution transport contract.
//!
//! A [`TransportConnector`] establishes a [`Transport`] once per run; the
//! transport then runs scripts and moves files on individual compute nodes.

mod traits;
mod types;

pub use traits::{Transport, TransportConnector};
pub use types::{ConnectOptions, ExecOutput, RemoteNode, REBOOT_EXIT_STATUS};
