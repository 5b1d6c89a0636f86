use std::time::Duration;

/// Exit status the transport treats as a request to reboot the host.
pub const REBOOT_EXIT_STATUS: i32 = 113;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteNode {
    pub id: String,
    pub hostname: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Local address remote nodes should use for transfers.
    pub bind_address: Option<String>,
    pub timeout: Duration,
}
