use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use super::types::{FailureKind, Outcome};

/// Monotonic per-run counters shared by the workers.
#[derive(Debug, Default)]
pub struct RunCounters {
    started: AtomicUsize,
    completed: AtomicUsize,
    /// Failed outcomes other than timeouts, including local path rejections.
    transport_errors: AtomicUsize,
    timeouts: AtomicUsize,
    nonzero_exits: AtomicUsize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CounterSnapshot {
    pub started: usize,
    pub completed: usize,
    pub transport_errors: usize,
    pub timeouts: usize,
    pub nonzero_exits: usize,
}

impl RunCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_start(&self) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_completion(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Completed { exit_status, .. } if *exit_status != 0 => {
                self.nonzero_exits.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Completed { .. } => {}
            Outcome::Failed {
                kind: FailureKind::Timeout,
                ..
            } => {
                self.timeouts.fetch_add(1, Ordering::SeqCst);
            }
            Outcome::Failed { .. } => {
                self.transport_errors.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            started: self.started.load(Ordering::SeqCst),
            completed: self.completed.load(Ordering::SeqCst),
            transport_errors: self.transport_errors.load(Ordering::SeqCst),
            timeouts: self.timeouts.load(Ordering::SeqCst),
            nonzero_exits: self.nonzero_exits.load(Ordering::SeqCst),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_classify_outcomes() {
        let counters = RunCounters::new();
        for outcome in [
            Outcome::Completed {
                exit_status: 0,
                stdout: Vec::new(),
                stderr: Vec::new(),
            },
            Outcome::Completed {
                exit_status: 3,
                stdout: Vec::new(),
                stderr: Vec::new(),
            },
            Outcome::failed(FailureKind::Timeout, "slow"),
            Outcome::failed(FailureKind::Transport, "down"),
            Outcome::failed(FailureKind::InvalidPath, "escape"),
        ] {
            counters.record_start();
            counters.record_completion(&outcome);
        }

        let snap = counters.snapshot();
        assert_eq!(snap.started, 5);
        assert_eq!(snap.completed, 5);
        assert_eq!(snap.nonzero_exits, 1);
        assert_eq!(snap.timeouts, 1);
        assert_eq!(snap.transport_errors, 2);
    }
}
