//! Fleet-wide dispatch of one request across a resolved scope.
//!
//! ```text
//! ScopeSpec + ExecutionRequest
//!   ↓
//! Dispatcher::run()
//!   ├─ TransportConfig::resolve()
//!   ├─ TopologyProvider::load()
//!   ├─ bind address (transfers only)
//!   ├─ TransportConnector::connect() (skipped on dry run)
//!   ├─ scope::resolve() → Vec<Target>
//!   └─ WorkerPool::run() → RunEvent::Result per target
//!   ↓
//! mpsc::Receiver<RunEvent> → ResultFormatter
//! ```

mod counters;
mod engine;
mod pool;
mod progress;
mod state;
pub mod traits;
pub mod types;

pub use counters::{CounterSnapshot, RunCounters};
pub use engine::{Dispatcher, DispatcherBuilder};
pub use pool::WorkerPool;
pub use progress::ProgressMonitor;
pub use state::{DispatchState, StateTransition, TransitionError};
pub use traits::{drive_formatter, ResultFormatter};
pub use types::{
    DispatchOptions, ExecutionRequest, ExecutionResult, FailureKind, Operation, OperationKind,
    Outcome, RunEvent, RunSummary,
};
