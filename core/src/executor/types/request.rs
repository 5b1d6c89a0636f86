use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;
use crate::scope::Target;
use crate::script;

/// What to do on every target. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionRequest {
    RunCommand {
        script: String,
    },
    /// Local file to a directory on each target.
    PushFile {
        local_path: PathBuf,
        remote_dir: String,
        clobber: bool,
    },
    /// File on each target into a local directory, stored as `<dir>/<label>`.
    PullFile {
        remote_file: String,
        local_dir: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Exec,
    Push,
    Pull,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exec => "exec",
            Self::Push => "push",
            Self::Pull => "pull",
        };
        f.write_str(name)
    }
}

impl ExecutionRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::RunCommand { .. } => OperationKind::Exec,
            Self::PushFile { .. } => OperationKind::Push,
            Self::PullFile { .. } => OperationKind::Pull,
        }
    }

    pub fn is_transfer(&self) -> bool {
        !matches!(self, Self::RunCommand { .. })
    }
}

/// The concrete transport call for one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Exec {
        script: String,
    },
    Push {
        local_path: PathBuf,
        remote_dir: String,
        clobber: bool,
    },
    Pull {
        remote_file: String,
        local_dir: PathBuf,
        local_name: String,
    },
}

/// Translates `request` into the call made for `target`.
///
/// In zone context scripts are wrapped to run inside the zone and transfer
/// paths are mapped under the zone's root and checked to stay there.
pub fn plan_operation(
    request: &ExecutionRequest,
    target: &Target,
) -> Result<Operation, ConfigurationError> {
    let zone = target.zonename.as_deref();

    match request {
        ExecutionRequest::RunCommand { script } => {
            let script = match zone {
                Some(zonename) => script::wrap(zonename, script)?,
                None => script.clone(),
            };
            Ok(Operation::Exec { script })
        }
        ExecutionRequest::PushFile {
            local_path,
            remote_dir,
            clobber,
        } => Ok(Operation::Push {
            local_path: local_path.clone(),
            remote_dir: remote_path(zone, remote_dir)?,
            clobber: *clobber,
        }),
        ExecutionRequest::PullFile {
            remote_file,
            local_dir,
        } => Ok(Operation::Pull {
            remote_file: remote_path(zone, remote_file)?,
            local_dir: local_dir.clone(),
            local_name: target.label().to_string(),
        }),
    }
}

fn remote_path(zone: Option<&str>, path: &str) -> Result<String, ConfigurationError> {
    match zone {
        Some(zonename) => {
            let resolved = script::zone_path(zonename, path);
            script::validate(&resolved, zonename)?;
            Ok(resolved)
        }
        None => Ok(path.to_string()),
    }
}

/// One-line, human-readable description of what would run on `target`.
pub fn describe_operation(request: &ExecutionRequest, target: &Target) -> String {
    let place = match &target.zonename {
        Some(zone) => format!("zone {} on {}", zone, target.hostname),
        None => format!("global zone of {}", target.hostname),
    };

    match (request, plan_operation(request, target)) {
        (_, Err(e)) => format!("{}: would fail: {}", place, e),
        (ExecutionRequest::RunCommand { script }, Ok(_)) => {
            format!("{}: would execute: {}", place, script.trim_end())
        }
        (_, Ok(Operation::Push { local_path, remote_dir, clobber })) => format!(
            "{}: would push {} to {}:{}{}",
            place,
            local_path.display(),
            target.hostname,
            remote_dir,
            if clobber { " (overwrite)" } else { "" }
        ),
        (_, Ok(Operation::Pull { remote_file, local_dir, local_name })) => format!(
            "{}: would pull {}:{} to {}",
            place,
            target.hostname,
            remote_file,
            local_dir.join(local_name).display()
        ),
        (_, Ok(Operation::Exec { script })) => format!("{}: would execute: {}", place, script),
    }
}
