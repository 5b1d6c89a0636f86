use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::{DispatchConfig, ALWAYS_DISALLOWED_SERVICE};

/// Extra result-channel capacity beyond one slot per worker.
pub const RESULT_CHANNEL_SLACK: usize = 8;

/// Tuning parameters for one dispatcher run.
#[derive(Debug, Clone)]
pub struct DispatchOptions {
    /// Maximum operations outstanding at once (at least 1).
    pub concurrency: usize,

    /// Bound on each individual exec/push/pull.
    pub exec_timeout: Duration,

    /// Bound on establishing the transport.
    pub connect_timeout: Duration,

    /// Explicit local address for transfers; probed when `None`.
    pub bind_ip: Option<String>,

    /// Report what would run without contacting the transport.
    pub dry_run: bool,

    pub disallowed_services: BTreeSet<String>,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl DispatchOptions {
    pub fn from_config(cfg: &DispatchConfig) -> Self {
        Self {
            concurrency: cfg.concurrency.max(1),
            exec_timeout: Duration::from_secs(cfg.exec_timeout_secs),
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            bind_ip: cfg.bind_ip.clone().filter(|s| !s.trim().is_empty()),
            dry_run: false,
            disallowed_services: cfg.disallowed_services(),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_exec_timeout(mut self, timeout: Duration) -> Self {
        self.exec_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_bind_ip(mut self, bind_ip: Option<String>) -> Self {
        self.bind_ip = bind_ip.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Ensures the built-in disallowed service is present even if a caller
    /// replaced the set.
    pub(crate) fn effective_disallowed(&self) -> BTreeSet<String> {
        let mut set = self.disallowed_services.clone();
        set.insert(ALWAYS_DISALLOWED_SERVICE.to_string());
        set
    }

    pub fn channel_capacity(&self) -> usize {
        self.concurrency.max(1) + RESULT_CHANNEL_SLACK
    }
}
