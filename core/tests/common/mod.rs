#![allow(dead_code)]

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use oneach_core::api::{
    ComputeNode, ConnectOptions, ExecOutput, ExecutionResult, IdentityProbe, LocalIdentity,
    RemoteNode, RunEvent, TopologyProvider, TopologySnapshot, Transport, TransportConfig,
    TransportConnector, ZoneRecord,
};

/// Three compute nodes, eight zones across three services plus one
/// disallowed zone.
pub fn fleet() -> TopologySnapshot {
    let cn = |id: &str, host: &str, addr: &str| ComputeNode {
        id: id.to_string(),
        hostname: host.to_string(),
        address: Some(addr.to_string()),
    };
    let zone = |name: &str, svc: &str, cn: &str| ZoneRecord {
        zonename: name.to_string(),
        service: svc.to_string(),
        compute_node_id: cn.to_string(),
        address: Some(format!("10.1.0.{}", &name[1..])),
    };

    let mut snapshot = TopologySnapshot::new(
        vec![
            cn("cn1", "RA10001", "10.0.0.1"),
            cn("cn2", "RA10002", "10.0.0.2"),
            cn("cn3", "RA10003", "10.0.0.3"),
        ],
        vec![
            zone("z1", "webapi", "cn1"),
            zone("z2", "webapi", "cn2"),
            zone("z3", "webapi", "cn3"),
            zone("z4", "moray", "cn1"),
            zone("z5", "moray", "cn2"),
            zone("z6", "moray", "cn3"),
            zone("z7", "postgres", "cn1"),
            zone("z8", "postgres", "cn2"),
            zone("z9", "marlin", "cn3"),
        ],
    );
    snapshot.services = vec![
        "webapi".into(),
        "moray".into(),
        "postgres".into(),
        "marlin".into(),
    ];
    snapshot
}

pub struct StaticTopology {
    snapshot: Option<TopologySnapshot>,
    pub closes: AtomicUsize,
}

impl StaticTopology {
    pub fn new(snapshot: TopologySnapshot) -> Arc<Self> {
        Arc::new(Self {
            snapshot: Some(snapshot),
            closes: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            snapshot: None,
            closes: AtomicUsize::new(0),
        })
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TopologyProvider for StaticTopology {
    fn name(&self) -> &str {
        "static"
    }

    async fn load(&self) -> anyhow::Result<TopologySnapshot> {
        self.snapshot
            .clone()
            .ok_or_else(|| anyhow::anyhow!("registry unavailable"))
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Records every call and can be told to stall or fail on chosen nodes.
#[derive(Default)]
pub struct RecordingTransport {
    pub delay: Duration,
    pub stall_hosts: HashSet<String>,
    pub failing_hosts: HashSet<String>,
    pub exit_status: i32,
    pub calls: Mutex<Vec<String>>,
    pub in_flight: AtomicUsize,
    pub peak: AtomicUsize,
    pub closes: AtomicUsize,
}

impl RecordingTransport {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn simulate(&self, node: &RemoteNode, call: String) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(call);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if self.stall_hosts.contains(&node.hostname) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        } else if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_hosts.contains(&node.hostname) {
            anyhow::bail!("connection reset by {}", node.hostname);
        }
        Ok(())
    }
}

/// Shared handle given out by [`CountingConnector`].
pub struct TransportHandle(pub Arc<RecordingTransport>);

#[async_trait]
impl Transport for TransportHandle {
    async fn exec(
        &self,
        node: &RemoteNode,
        script: &str,
        _timeout: Duration,
    ) -> anyhow::Result<ExecOutput> {
        self.0
            .simulate(node, format!("exec {}", node.hostname))
            .await?;
        Ok(ExecOutput {
            exit_status: self.0.exit_status,
            stdout: format!("{} ran {} bytes\n", node.hostname, script.len()).into_bytes(),
            stderr: Vec::new(),
        })
    }

    async fn push(
        &self,
        node: &RemoteNode,
        local_path: &Path,
        remote_dir: &str,
        _clobber: bool,
        _timeout: Duration,
    ) -> anyhow::Result<()> {
        let call = format!(
            "push {} {} {}",
            node.hostname,
            local_path.display(),
            remote_dir
        );
        self.0.simulate(node, call).await
    }

    async fn pull(
        &self,
        node: &RemoteNode,
        remote_file: &str,
        local_dir: &Path,
        local_name: &str,
        _timeout: Duration,
    ) -> anyhow::Result<()> {
        let call = format!(
            "pull {} {} {}",
            node.hostname,
            remote_file,
            local_dir.join(local_name).display()
        );
        self.0.simulate(node, call).await
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.0.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out clones of one shared transport and remembers how it was asked.
pub struct CountingConnector {
    pub transport: Arc<RecordingTransport>,
    pub connects: AtomicUsize,
    pub bind_addresses: Mutex<Vec<Option<String>>>,
    pub fail: bool,
    pub hang: bool,
}

impl CountingConnector {
    pub fn new(transport: RecordingTransport) -> Arc<Self> {
        Arc::new(Self {
            transport: Arc::new(transport),
            connects: AtomicUsize::new(0),
            bind_addresses: Mutex::new(Vec::new()),
            fail: false,
            hang: false,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            transport: Arc::new(RecordingTransport::default()),
            connects: AtomicUsize::new(0),
            bind_addresses: Mutex::new(Vec::new()),
            fail: true,
            hang: false,
        })
    }

    pub fn hanging() -> Arc<Self> {
        Arc::new(Self {
            transport: Arc::new(RecordingTransport::default()),
            connects: AtomicUsize::new(0),
            bind_addresses: Mutex::new(Vec::new()),
            fail: false,
            hang: true,
        })
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.transport.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportConnector for CountingConnector {
    fn name(&self) -> &str {
        "recording"
    }

    async fn connect(
        &self,
        _config: &TransportConfig,
        options: &ConnectOptions,
    ) -> anyhow::Result<Box<dyn Transport>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.bind_addresses
            .lock()
            .unwrap()
            .push(options.bind_address.clone());
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail {
            anyhow::bail!("message bus refused connection");
        }
        Ok(Box::new(TransportHandle(self.transport.clone())))
    }
}

pub struct FixedIdentity(pub LocalIdentity);

#[async_trait]
impl IdentityProbe for FixedIdentity {
    async fn identify(&self) -> anyhow::Result<LocalIdentity> {
        Ok(self.0.clone())
    }
}

/// Drains a run's events concurrently so a full channel never stalls it.
pub fn spawn_collector(mut rx: mpsc::Receiver<RunEvent>) -> JoinHandle<Vec<RunEvent>> {
    tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    })
}

pub fn results(events: &[RunEvent]) -> Vec<&ExecutionResult> {
    events
        .iter()
        .filter_map(|e| match e {
            RunEvent::Result(r) => Some(r),
            _ => None,
        })
        .collect()
}
