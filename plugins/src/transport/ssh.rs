use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use oneach_core::api::{
    ConnectOptions, ExecOutput, RemoteNode, Transport, TransportConfig, TransportConnector,
};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// ssh exits with this status when it could not run the remote command.
const SSH_FAILURE_STATUS: i32 = 255;

/// Prefix of the trailing stderr line carrying the remote script's status.
const EXIT_MARKER: &str = "__ONEACH_EXIT_STATUS=";

/// Remote side of `exec`: runs the script from stdin, then reports its
/// status on stderr so it can be told apart from ssh's own 255.
fn remote_exec_command() -> String {
    format!(
        "bash -s; rv=$?; printf '\\n{}%d\\n' \"$rv\" >&2; exit \"$rv\"",
        EXIT_MARKER
    )
}

/// Connects by locating `ssh` and `scp`; each operation is its own subprocess.
#[derive(Debug, Default)]
pub struct SshConnector;

impl SshConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for SshConnector {
    fn name(&self) -> &str {
        "ssh"
    }

    async fn connect(
        &self,
        config: &TransportConfig,
        options: &ConnectOptions,
    ) -> Result<Box<dyn Transport>> {
        let ssh = which::which(&config.ssh_program)
            .with_context(|| format!("cannot find ssh program \"{}\"", config.ssh_program))?;
        let scp = which::which(&config.scp_program)
            .with_context(|| format!("cannot find scp program \"{}\"", config.scp_program))?;

        let mut common = config.options.clone();
        common.push("-o".into());
        common.push(format!("ConnectTimeout={}", options.timeout.as_secs().max(1)));
        if let Some(addr) = &options.bind_address {
            common.push("-o".into());
            common.push(format!("BindAddress={}", addr));
        }

        tracing::debug!(
            ssh = %ssh.display(),
            scp = %scp.display(),
            user = %config.user,
            bind_address = ?options.bind_address,
            "ssh transport ready"
        );

        Ok(Box::new(SshTransport {
            ssh,
            scp,
            user: config.user.clone(),
            options: common,
        }))
    }
}

pub struct SshTransport {
    ssh: PathBuf,
    scp: PathBuf,
    user: String,
    options: Vec<String>,
}

impl SshTransport {
    fn destination(&self, node: &RemoteNode) -> String {
        format!("{}@{}", self.user, node.hostname)
    }

    fn ssh_command(&self, node: &RemoteNode, remote_command: &str) -> Command {
        let mut cmd = Command::new(&self.ssh);
        cmd.args(&self.options)
            .arg(self.destination(node))
            .arg(remote_command)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run_scp(&self, from: &str, to: &str) -> Result<()> {
        let output = Command::new(&self.scp)
            .args(&self.options)
            .arg("-q")
            .arg(from)
            .arg(to)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("failed to spawn scp")?;

        if !output.status.success() {
            bail!(
                "scp {} -> {} failed: {}",
                from,
                to,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn remote_exists(&self, node: &RemoteNode, path: &str) -> Result<bool> {
        let output = self
            .ssh_command(node, &format!("test -e {}", shell_quote(path)))
            .stdin(Stdio::null())
            .output()
            .await
            .context("failed to spawn ssh")?;

        match output.status.code() {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            _ => bail!(
                "ssh to {} failed: {}",
                node.hostname,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        }
    }
}

#[async_trait]
impl Transport for SshTransport {
    async fn exec(
        &self,
        node: &RemoteNode,
        script: &str,
        _timeout: Duration,
    ) -> Result<ExecOutput> {
        let mut child = self
            .ssh_command(node, &remote_exec_command())
            .stdin(Stdio::piped())
            .spawn()
            .context("failed to spawn ssh")?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(script.as_bytes())
                .await
                .context("failed to send script")?;
        }

        let output = child.wait_with_output().await.context("ssh did not finish")?;
        let (reported, stderr) = split_exit_marker(output.stderr);
        if let Some(exit_status) = reported {
            return Ok(ExecOutput {
                exit_status,
                stdout: output.stdout,
                stderr,
            });
        }

        let Some(exit_status) = output.status.code() else {
            bail!("ssh to {} was terminated by a signal", node.hostname);
        };
        if exit_status == SSH_FAILURE_STATUS {
            bail!(
                "ssh to {} failed: {}",
                node.hostname,
                String::from_utf8_lossy(&stderr).trim()
            );
        }

        Ok(ExecOutput {
            exit_status,
            stdout: output.stdout,
            stderr,
        })
    }

    async fn push(
        &self,
        node: &RemoteNode,
        local_path: &Path,
        remote_dir: &str,
        clobber: bool,
        _timeout: Duration,
    ) -> Result<()> {
        let file_name = local_path
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("{} does not name a file", local_path.display()))?;
        let remote_path = format!("{}/{}", remote_dir.trim_end_matches('/'), file_name);

        if !clobber && self.remote_exists(node, &remote_path).await? {
            bail!(
                "{}:{} already exists (enable clobber to overwrite)",
                node.hostname,
                remote_path
            );
        }

        let local = local_path
            .to_str()
            .with_context(|| format!("{} is not valid UTF-8", local_path.display()))?;
        self.run_scp(local, &format!("{}:{}", self.destination(node), remote_path))
            .await
    }

    async fn pull(
        &self,
        node: &RemoteNode,
        remote_file: &str,
        local_dir: &Path,
        local_name: &str,
        _timeout: Duration,
    ) -> Result<()> {
        tokio::fs::create_dir_all(local_dir)
            .await
            .with_context(|| format!("failed to create {}", local_dir.display()))?;
        let local_path = local_dir.join(local_name);
        let local = local_path
            .to_str()
            .with_context(|| format!("{} is not valid UTF-8", local_path.display()))?;

        self.run_scp(&format!("{}:{}", self.destination(node), remote_file), local)
            .await
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Strips the trailing exit marker line from `stderr`, returning the status
/// it carried. Output without a well-formed marker is returned untouched.
fn split_exit_marker(stderr: Vec<u8>) -> (Option<i32>, Vec<u8>) {
    let needle = format!("\n{}", EXIT_MARKER);
    let Some(pos) = stderr
        .windows(needle.len())
        .rposition(|w| w == needle.as_bytes())
    else {
        return (None, stderr);
    };

    let status = std::str::from_utf8(&stderr[pos + needle.len()..])
        .ok()
        .and_then(|s| s.trim_end().parse::<i32>().ok());
    match status {
        Some(status) => {
            let mut stripped = stderr;
            stripped.truncate(pos);
            (Some(status), stripped)
        }
        None => (None, stderr),
    }
}

/// Single-quotes `s` for the remote shell. Not applied to scp operands,
/// which newer scp versions pass through sftp unexpanded.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
