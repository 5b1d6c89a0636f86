use std::path::PathBuf;
use std::time::Duration;

use oneach_core::api::{
    drive_formatter, AppConfig, CliError, DispatchError, DispatchOptions, Dispatcher,
    ExecutionRequest, RunSummary, ScopeSpec,
};
use oneach_plugins::factory;
use oneach_plugins::formatters::{LineMode, TextFormatterConfig};

use crate::commands::cli::Args;

/// Everything a run needs, validated from the command line and config.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub scope: ScopeSpec,
    pub request: ExecutionRequest,
    pub options: DispatchOptions,
    pub format: &'static str,
    pub text: TextFormatterConfig,
}

impl Invocation {
    pub fn from_args(
        args: &Args,
        cfg: &AppConfig,
        stderr_is_tty: bool,
    ) -> Result<Self, CliError> {
        let scope = build_scope(args)?;
        let request = build_request(args)?;

        let mut options = DispatchOptions::from_config(&cfg.dispatch).with_dry_run(args.dry_run);
        if let Some(secs) = args.exec_timeout {
            if secs == 0 {
                return Err(CliError::Usage("--exectimeout must be positive".into()));
            }
            options = options.with_exec_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = args.concurrency {
            if n == 0 {
                return Err(CliError::Usage("--concurrency must be positive".into()));
            }
            options = options.with_concurrency(n);
        }
        if args.bind_ip.is_some() {
            options = options.with_bind_ip(args.bind_ip.clone());
        }

        let batched = !args.immediate;
        let line_mode = if args.oneline {
            LineMode::One
        } else if args.multiline || !batched {
            LineMode::Multi
        } else {
            LineMode::Auto
        };

        Ok(Self {
            scope,
            request,
            options,
            format: if args.jsonstream { "jsonl" } else { "text" },
            text: TextFormatterConfig {
                omit_header: args.omit_header,
                batched,
                line_mode,
                host_context: args.global_zone,
                show_progress: batched && stderr_is_tty,
                summary: !args.omit_header,
            },
        })
    }
}

fn build_scope(args: &Args) -> Result<ScopeSpec, CliError> {
    let mut scope = ScopeSpec {
        all_targets: args.all_zones,
        ..ScopeSpec::default()
    };
    if !args.zonenames.is_empty() {
        scope = scope.with_zonenames(args.zonenames.iter().cloned());
    }
    if !args.services.is_empty() {
        scope = scope.with_services(args.services.iter().cloned());
    }
    if !args.compute_nodes.is_empty() {
        scope = scope.with_compute_nodes(args.compute_nodes.iter().cloned());
    }
    if args.global_zone {
        scope = scope.in_host_context();
    }

    scope
        .validate()
        .map_err(|e| CliError::Usage(e.to_string()))?;
    Ok(scope)
}

fn build_request(args: &Args) -> Result<ExecutionRequest, CliError> {
    let has_command = !args.command.is_empty();
    let modes = [has_command, args.get.is_some(), args.put.is_some()];
    if modes.iter().filter(|m| **m).count() != 1 {
        return Err(CliError::Usage(
            "specify exactly one of a command, --get or --put".into(),
        ));
    }

    let dir = || {
        args.dir
            .clone()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| CliError::Usage("--get and --put require --dir".into()))
    };

    if let Some(remote_file) = &args.get {
        return Ok(ExecutionRequest::PullFile {
            remote_file: remote_file.clone(),
            local_dir: PathBuf::from(dir()?),
        });
    }
    if let Some(local_path) = &args.put {
        return Ok(ExecutionRequest::PushFile {
            local_path: local_path.clone(),
            remote_dir: dir()?,
            clobber: args.clobber,
        });
    }

    if args.dir.is_some() {
        return Err(CliError::Usage("--dir is only valid with --get or --put".into()));
    }
    let script = args.command.join(" ");
    if script.trim().is_empty() {
        return Err(CliError::Usage("command must not be empty".into()));
    }
    Ok(ExecutionRequest::RunCommand { script })
}

/// Runs one invocation to completion and returns the process exit code.
pub async fn run_app_with_config(args: Args, cfg: AppConfig) -> Result<i32, CliError> {
    let invocation = Invocation::from_args(&args, &cfg, atty::is(atty::Stream::Stderr))?;
    tracing::debug!(
        scope = ?invocation.scope,
        operation = %invocation.request.kind(),
        concurrency = invocation.options.concurrency,
        "validated invocation"
    );

    let mut formatter = factory::build_formatter(invocation.format, invocation.text)
        .map_err(|e| CliError::Usage(e.to_string()))?;
    let topology = factory::build_topology(&cfg).map_err(|e| CliError::Config(e.to_string()))?;

    let mut dispatcher = Dispatcher::builder(invocation.scope, invocation.request)
        .options(invocation.options)
        .transport_config(cfg.transport.clone())
        .topology(topology)
        .connector(factory::build_connector())
        .identity(factory::build_identity())
        .build()
        .map_err(DispatchError::from)?;

    let (tx, rx) = dispatcher.result_channel();
    let consumer = tokio::spawn(async move { drive_formatter(formatter.as_mut(), rx).await });

    let outcome = dispatcher.run(tx).await;
    let rendered = consumer
        .await
        .map_err(|e| CliError::Output(format!("formatter task failed: {}", e)))?;

    let summary = outcome?;
    rendered.map_err(|e| CliError::Output(e.to_string()))?;
    Ok(exit_code_for_summary(&summary))
}

pub fn exit_code_for_summary(summary: &RunSummary) -> i32 {
    if summary.dry_run || summary.all_succeeded() {
        0
    } else {
        1
    }
}
