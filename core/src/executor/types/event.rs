use crate::scope::Target;

use super::request::OperationKind;
use super::result::{ExecutionResult, RunSummary};

/// Events produced by a dispatcher run, in arrival order.
///
/// An executed run yields `Start`, one `Result` per target and `End`. A dry
/// run yields `Start`, one `Plan` per target and `End`. A run that fails
/// during startup yields nothing.
#[derive(Debug, Clone)]
pub enum RunEvent {
    Start {
        run_id: String,
        operation: OperationKind,
        total_targets: usize,
        host_context: bool,
        dry_run: bool,
    },
    Plan {
        target: Target,
        operation: String,
    },
    Result(ExecutionResult),
    End(RunSummary),
}
