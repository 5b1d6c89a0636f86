use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::TransportConfig;
use crate::error::{ConfigurationError, DispatchError};
use crate::identity::{IdentityProbe, LocalIdentity};
use crate::scope::{self, ScopeSpec, Target};
use crate::script;
use crate::topology::{TopologyProvider, TopologySnapshot};
use crate::transport::{ConnectOptions, Transport, TransportConnector};

use super::counters::RunCounters;
use super::pool::WorkerPool;
use super::state::{DispatchState, StateTransition};
use super::types::{
    describe_operation, plan_operation, DispatchOptions, ExecutionRequest, ExecutionResult,
    FailureKind, Operation, Outcome, RunEvent, RunSummary,
};

/// Runs one request against one scope, exactly once.
///
/// The dispatcher owns its topology provider and transport for the length of
/// the run and releases both before `run` returns, whatever the outcome.
pub struct Dispatcher {
    run_id: String,
    scope: ScopeSpec,
    request: ExecutionRequest,
    options: DispatchOptions,
    transport_config: TransportConfig,
    topology: Option<Arc<dyn TopologyProvider>>,
    connector: Arc<dyn TransportConnector>,
    identity: Option<Arc<dyn IdentityProbe>>,
    transport: Option<Arc<dyn Transport>>,
    counters: Arc<RunCounters>,
    state: DispatchState,
    invoked: bool,
}

pub struct DispatcherBuilder {
    scope: ScopeSpec,
    request: ExecutionRequest,
    options: DispatchOptions,
    transport_config: TransportConfig,
    topology: Option<Arc<dyn TopologyProvider>>,
    connector: Option<Arc<dyn TransportConnector>>,
    identity: Option<Arc<dyn IdentityProbe>>,
}

impl DispatcherBuilder {
    pub fn new(scope: ScopeSpec, request: ExecutionRequest) -> Self {
        Self {
            scope,
            request,
            options: DispatchOptions::default(),
            transport_config: TransportConfig::default(),
            topology: None,
            connector: None,
            identity: None,
        }
    }

    pub fn options(mut self, options: DispatchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn transport_config(mut self, config: TransportConfig) -> Self {
        self.transport_config = config;
        self
    }

    pub fn topology(mut self, provider: Arc<dyn TopologyProvider>) -> Self {
        self.topology = Some(provider);
        self
    }

    pub fn connector(mut self, connector: Arc<dyn TransportConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn identity(mut self, probe: Arc<dyn IdentityProbe>) -> Self {
        self.identity = Some(probe);
        self
    }

    pub fn build(self) -> Result<Dispatcher, ConfigurationError> {
        let topology = self
            .topology
            .ok_or_else(|| ConfigurationError::Invalid("no topology provider configured".into()))?;
        let connector = self
            .connector
            .ok_or_else(|| {
                ConfigurationError::Invalid("no transport connector configured".into())
            })?;

        Ok(Dispatcher {
            run_id: Uuid::new_v4().to_string(),
            scope: self.scope,
            request: self.request,
            options: self.options,
            transport_config: self.transport_config,
            topology: Some(topology),
            connector,
            identity: self.identity,
            transport: None,
            counters: Arc::new(RunCounters::new()),
            state: DispatchState::Created,
            invoked: false,
        })
    }
}

impl Dispatcher {
    pub fn builder(scope: ScopeSpec, request: ExecutionRequest) -> DispatcherBuilder {
        DispatcherBuilder::new(scope, request)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    /// Bounded result channel sized for this dispatcher's concurrency.
    pub fn result_channel(&self) -> (mpsc::Sender<RunEvent>, mpsc::Receiver<RunEvent>) {
        mpsc::channel(self.options.channel_capacity())
    }

    /// Runs the pipeline and streams events to `events`.
    ///
    /// # Panics
    ///
    /// Panics when called a second time on the same dispatcher, or when the
    /// run ends with `started != completed`.
    ///
    /// The transport and topology handles are only released when this future
    /// runs to completion. Dropping it mid-run skips `Transport::close`.
    pub async fn run(
        &mut self,
        events: mpsc::Sender<RunEvent>,
    ) -> Result<RunSummary, DispatchError> {
        assert!(
            !self.invoked,
            "Dispatcher::run called twice for run {}",
            self.run_id
        );
        self.invoked = true;

        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            run_id = %self.run_id,
            operation = %self.request.kind(),
            dry_run = self.options.dry_run,
            "starting run"
        );

        let result = self.run_pipeline(&events, started_at, clock).await;
        self.release().await;

        let counts = self.counters.snapshot();
        assert_eq!(
            counts.started, counts.completed,
            "run {} finished with {} operations started but {} completed",
            self.run_id, counts.started, counts.completed
        );

        match result {
            Ok(summary) => {
                self.advance(DispatchState::Succeeded);
                tracing::info!(
                    run_id = %self.run_id,
                    targets = summary.targets,
                    failures = summary.failures(),
                    duration_ms = summary.duration_ms,
                    "run finished"
                );
                if events.send(RunEvent::End(summary.clone())).await.is_err() {
                    tracing::debug!("result consumer closed before end of run");
                }
                Ok(summary)
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    state = StateTransition::describe(self.state),
                    error = %e,
                    "run aborted"
                );
                self.advance(DispatchState::Failed);
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &mut self,
        events: &mpsc::Sender<RunEvent>,
        started_at: DateTime<Utc>,
        clock: Instant,
    ) -> Result<RunSummary, DispatchError> {
        self.scope.validate()?;
        let transport_config = self.transport_config.resolve()?;
        self.advance(DispatchState::ConfigResolved);

        let snapshot = self.load_topology().await?;
        self.advance(DispatchState::TopologyLoaded);

        let bind_address = if self.request.is_transfer() {
            let address = self.resolve_bind_address(&snapshot).await?;
            tracing::debug!(bind_address = %address, "resolved bind address");
            self.advance(DispatchState::BindAddressResolved);
            Some(address)
        } else {
            None
        };

        if !self.options.dry_run {
            self.connect(&transport_config, bind_address).await?;
            self.advance(DispatchState::TransportReady);
        }

        let targets = scope::resolve(
            &snapshot,
            &self.scope,
            &self.options.effective_disallowed(),
        )?;
        if let ExecutionRequest::RunCommand { script } = &self.request {
            if !self.scope.host_context {
                script::check_script(script)?;
            }
        }
        self.advance(DispatchState::ScopeResolved);

        let total_targets = targets.len();
        let start = RunEvent::Start {
            run_id: self.run_id.clone(),
            operation: self.request.kind(),
            total_targets,
            host_context: self.scope.host_context,
            dry_run: self.options.dry_run,
        };
        if events.send(start).await.is_err() {
            tracing::debug!("result consumer closed before start of run");
        }

        if self.options.dry_run {
            self.report_dry_run(&targets, events).await;
            self.advance(DispatchState::DryRunReported);
        } else {
            self.advance(DispatchState::Executing);
            self.execute(targets, events).await?;
        }

        let counts = self.counters.snapshot();
        Ok(RunSummary {
            run_id: self.run_id.clone(),
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            dry_run: self.options.dry_run,
            targets: total_targets,
            started: counts.started,
            completed: counts.completed,
            transport_errors: counts.transport_errors,
            timeouts: counts.timeouts,
            nonzero_exits: counts.nonzero_exits,
        })
    }

    async fn load_topology(&self) -> Result<TopologySnapshot, DispatchError> {
        let provider = self
            .topology
            .as_ref()
            .ok_or_else(|| DispatchError::Topology("topology provider already released".into()))?;
        let snapshot = provider
            .load()
            .await
            .map_err(|e| DispatchError::Topology(format!("{}: {:#}", provider.name(), e)))?;
        tracing::debug!(
            provider = provider.name(),
            zones = snapshot.zones.len(),
            compute_nodes = snapshot.compute_nodes.len(),
            "loaded topology"
        );
        Ok(snapshot)
    }

    async fn resolve_bind_address(
        &self,
        snapshot: &TopologySnapshot,
    ) -> Result<String, ConfigurationError> {
        if let Some(ip) = &self.options.bind_ip {
            return Ok(ip.clone());
        }

        let probe = self.identity.as_ref().ok_or_else(|| {
            ConfigurationError::BindAddress(
                "no bind address configured and no way to identify this host".into(),
            )
        })?;
        let identity = probe
            .identify()
            .await
            .map_err(|e| ConfigurationError::BindAddress(format!("{:#}", e)))?;

        match identity {
            LocalIdentity::Zone(zonename) => snapshot
                .zone_address(&zonename)
                .map(str::to_string)
                .ok_or_else(|| {
                    ConfigurationError::BindAddress(format!(
                        "no address recorded for local zone {}",
                        zonename
                    ))
                }),
            LocalIdentity::Host(server_uuid) => snapshot
                .compute_node_address(&server_uuid)
                .map(str::to_string)
                .ok_or_else(|| {
                    ConfigurationError::BindAddress(format!(
                        "no address recorded for local compute node {}",
                        server_uuid
                    ))
                }),
        }
    }

    async fn connect(
        &mut self,
        config: &TransportConfig,
        bind_address: Option<String>,
    ) -> Result<(), DispatchError> {
        let timeout = self.options.connect_timeout;
        let options = ConnectOptions {
            bind_address,
            timeout,
        };

        let transport =
            match tokio::time::timeout(timeout, self.connector.connect(config, &options)).await {
                Ok(Ok(transport)) => transport,
                Ok(Err(e)) => {
                    return Err(DispatchError::TransportConnect(format!(
                        "{}: {:#}",
                        self.connector.name(),
                        e
                    )))
                }
                Err(_) => return Err(DispatchError::TransportConnectTimeout(timeout.as_secs())),
            };

        tracing::debug!(connector = self.connector.name(), "transport ready");
        self.transport = Some(Arc::from(transport));
        Ok(())
    }

    async fn report_dry_run(&self, targets: &[Target], events: &mpsc::Sender<RunEvent>) {
        for target in targets {
            let operation = describe_operation(&self.request, target);
            let plan = RunEvent::Plan {
                target: target.clone(),
                operation,
            };
            if events.send(plan).await.is_err() {
                tracing::debug!("result consumer closed during dry run");
                return;
            }
        }
    }

    async fn execute(
        &self,
        targets: Vec<Target>,
        events: &mpsc::Sender<RunEvent>,
    ) -> Result<(), DispatchError> {
        let transport = self
            .transport
            .clone()
            .ok_or_else(|| DispatchError::Worker("transport is not connected".into()))?;
        let pool = WorkerPool::new(self.options.concurrency);
        let request = &self.request;
        let counters = &self.counters;
        let timeout = self.options.exec_timeout;

        tracing::debug!(
            targets = targets.len(),
            concurrency = pool.size(),
            "dispatching"
        );

        pool.run(targets, |target: Target| {
            let transport = transport.clone();
            async move {
                counters.record_start();
                let outcome = perform(transport.as_ref(), request, &target, timeout).await;
                counters.record_completion(&outcome);

                if let Outcome::Failed { kind, message } = &outcome {
                    tracing::warn!(
                        target_label = target.label(),
                        host = %target.hostname,
                        operation = %request.kind(),
                        kind = ?kind,
                        "{}",
                        message
                    );
                }

                let result = ExecutionResult {
                    target,
                    operation: request.kind(),
                    outcome,
                };
                if events.send(RunEvent::Result(result)).await.is_err() {
                    tracing::debug!("result consumer closed; dropping result");
                }
            }
        })
        .await
    }

    /// Releases the transport and topology handles. Safe to call repeatedly;
    /// each handle is closed at most once.
    async fn release(&mut self) {
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                tracing::warn!(error = %e, "failed to close transport");
            }
        }
        if let Some(topology) = self.topology.take() {
            if let Err(e) = topology.close().await {
                tracing::warn!(error = %e, "failed to close topology provider");
            }
        }
    }

    fn advance(&mut self, to: DispatchState) {
        if let Err(e) = StateTransition::validate(self.state, to) {
            panic!("dispatcher {}: {}", self.run_id, e);
        }
        tracing::debug!(
            run_id = %self.run_id,
            from = StateTransition::describe(self.state),
            to = StateTransition::describe(to),
            "state transition"
        );
        self.state = to;
    }
}

/// Performs `request` on one target, bounded by `timeout`.
async fn perform(
    transport: &dyn Transport,
    request: &ExecutionRequest,
    target: &Target,
    timeout: Duration,
) -> Outcome {
    let operation = match plan_operation(request, target) {
        Ok(op) => op,
        Err(e @ ConfigurationError::InvalidPath { .. }) => {
            return Outcome::failed(FailureKind::InvalidPath, e.to_string())
        }
        Err(e) => return Outcome::failed(FailureKind::InvalidRequest, e.to_string()),
    };
    let node = target.remote_node();

    let call = async {
        match &operation {
            Operation::Exec { script } => transport.exec(&node, script, timeout).await.map(Some),
            Operation::Push {
                local_path,
                remote_dir,
                clobber,
            } => transport
                .push(&node, local_path, remote_dir, *clobber, timeout)
                .await
                .map(|_| None),
            Operation::Pull {
                remote_file,
                local_dir,
                local_name,
            } => transport
                .pull(&node, remote_file, local_dir, local_name, timeout)
                .await
                .map(|_| None),
        }
    };

    match tokio::time::timeout(timeout, call).await {
        Err(_) => Outcome::failed(
            FailureKind::Timeout,
            format!(
                "{} on {} timed out after {:?}",
                request.kind(),
                target.hostname,
                timeout
            ),
        ),
        Ok(Err(e)) => Outcome::failed(
            FailureKind::Transport,
            format!("{} on {}: {:#}", request.kind(), target.hostname, e),
        ),
        Ok(Ok(Some(output))) => Outcome::Completed {
            exit_status: output.exit_status,
            stdout: output.stdout,
            stderr: output.stderr,
        },
        Ok(Ok(None)) => Outcome::Completed {
            exit_status: 0,
            stdout: Vec::new(),
            stderr: Vec::new(),
        },
    }
}
