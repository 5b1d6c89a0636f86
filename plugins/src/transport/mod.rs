pub mod ssh;

pub use ssh::{SshConnector, SshTransport};
