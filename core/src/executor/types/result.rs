use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::scope::Target;

use super::request::OperationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The operation did not finish within its timeout.
    Timeout,
    /// The transport reported an error.
    Transport,
    /// A transfer path fell outside the target zone's root.
    InvalidPath,
    /// The request could not be prepared for this target.
    InvalidRequest,
}

fn lossy_utf8<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// The process ran to completion, possibly with a non-zero status.
    Completed {
        exit_status: i32,
        #[serde(serialize_with = "lossy_utf8")]
        stdout: Vec<u8>,
        #[serde(serialize_with = "lossy_utf8")]
        stderr: Vec<u8>,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl Outcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed { exit_status: 0, .. })
    }
}

/// The single outcome reported for one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub target: Target,
    pub operation: OperationKind,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ExecutionResult {
    /// Text an operator would want to see for this result: stdout, plus
    /// stderr when the process failed, or the failure message.
    pub fn output_text(&self) -> String {
        match &self.outcome {
            Outcome::Completed {
                exit_status,
                stdout,
                stderr,
            } => {
                let mut text = String::from_utf8_lossy(stdout).into_owned();
                if *exit_status != 0 {
                    let err = String::from_utf8_lossy(stderr);
                    if !err.trim().is_empty() {
                        if !text.is_empty() && !text.ends_with('\n') {
                            text.push('\n');
                        }
                        text.push_str(&err);
                    }
                }
                text
            }
            Outcome::Failed { kind, message } => {
                format!("{} failed ({}): {}", self.operation, kind_label(*kind), message)
            }
        }
    }
}

fn kind_label(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Timeout => "timeout",
        FailureKind::Transport => "transport error",
        FailureKind::InvalidPath => "invalid path",
        FailureKind::InvalidRequest => "invalid request",
    }
}

/// Totals carried by the end-of-run marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dry_run: bool,
    pub targets: usize,
    pub started: usize,
    pub completed: usize,
    pub transport_errors: usize,
    pub timeouts: usize,
    pub nonzero_exits: usize,
}

impl RunSummary {
    pub fn failures(&self) -> usize {
        self.transport_errors + self.timeouts + self.nonzero_exits
    }

    pub fn all_succeeded(&self) -> bool {
        self.completed == self.targets && self.failures() == 0
    }
}
