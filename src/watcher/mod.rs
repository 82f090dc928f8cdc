// Cluster state watcher: polls the cluster source and feeds changes into the log store.
// Stopped -> Monitoring on start (idempotent); Monitoring -> Stopped on stop.

pub mod diff;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{Duration, interval};
use tracing::instrument;

use crate::cluster_source::{ClusterSource, ResourceKind, SourceError};
use crate::config::MonitoringConfig;
use crate::log_store::LogStore;
use crate::models::{ClusterSnapshot, LogEntry, LogSource, Metadata, Operation, ResourceRef};
use diff::{ClusterEvent, diff_snapshots, initial_summary};

/// Watcher timing.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub poll_interval_ms: u64,
}

impl From<&MonitoringConfig> for WatcherConfig {
    fn from(config: &MonitoringConfig) -> Self {
        Self {
            poll_interval_ms: config.poll_interval_ms,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Every listing failed; there is nothing meaningful to diff.
    #[error("cluster source unreachable: {0}")]
    Unreachable(#[source] SourceError),
}

struct Run {
    stop_tx: oneshot::Sender<()>,
    task: tokio::task::JoinHandle<()>,
}

pub struct ClusterWatcher {
    source: Arc<dyn ClusterSource>,
    store: Arc<LogStore>,
    config: WatcherConfig,
    run: Mutex<Option<Run>>,
}

impl ClusterWatcher {
    pub fn new(source: Arc<dyn ClusterSource>, store: Arc<LogStore>, config: WatcherConfig) -> Self {
        Self {
            source,
            store,
            config,
            run: Mutex::new(None),
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .is_some_and(|run| !run.task.is_finished())
    }

    /// Starts polling. Returns false (and does nothing) if already monitoring.
    /// Every start begins without a baseline, so the first poll logs a summary.
    pub fn start(&self) -> bool {
        {
            let mut run = self.run.lock();
            if run.as_ref().is_some_and(|r| !r.task.is_finished()) {
                return false;
            }
            let (stop_tx, stop_rx) = oneshot::channel();
            let task = tokio::spawn(poll_loop(
                self.source.clone(),
                self.store.clone(),
                Duration::from_millis(self.config.poll_interval_ms),
                stop_rx,
            ));
            *run = Some(Run { stop_tx, task });
        }
        self.store.info(
            "Starting Kubernetes cluster monitoring",
            LogSource::K8sMonitor,
            Metadata::new().with("pollIntervalMs", self.config.poll_interval_ms),
        );
        true
    }

    /// Cancels the poll timer. A poll already in flight finishes, but no new
    /// fetch starts once this returns. Returns false if not monitoring.
    pub fn stop(&self) -> bool {
        let Some(run) = self.run.lock().take() else {
            return false;
        };
        let _ = run.stop_tx.send(());
        self.store.info(
            "Stopped Kubernetes cluster monitoring",
            LogSource::K8sMonitor,
            Metadata::new(),
        );
        true
    }

    /// Records an action some actuator performed on the cluster.
    pub fn log_operation(
        &self,
        operation: Operation,
        resource: &ResourceRef,
        details: Metadata,
    ) -> LogEntry {
        let event = operation_event(operation, resource, details);
        self.store
            .log(event.level, event.message, LogSource::K8sMonitor, event.metadata)
    }
}

impl Drop for ClusterWatcher {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            let _ = run.stop_tx.send(());
        }
    }
}

#[instrument(skip_all, fields(poll_interval_ms = poll_interval.as_millis() as u64))]
async fn poll_loop(
    source: Arc<dyn ClusterSource>,
    store: Arc<LogStore>,
    poll_interval: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut tick = interval(poll_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut baseline: Option<ClusterSnapshot> = None;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = tick.tick() => {
                baseline = capture_cycle(source.as_ref(), &store, baseline).await;
            }
        }
    }
    tracing::debug!("Watcher poll loop stopped");
}

/// One poll: fetch, then log either the initial summary or the diff against
/// `baseline`. Returns the baseline for the next cycle. When every listing
/// fails the old baseline is kept, so the cycle after recovery diffs against
/// the last good state instead of reporting every resource as deleted.
pub async fn capture_cycle(
    source: &dyn ClusterSource,
    store: &LogStore,
    baseline: Option<ClusterSnapshot>,
) -> Option<ClusterSnapshot> {
    let current = match fetch_snapshot(source).await {
        Ok(s) => s,
        Err(e) => {
            store.error(
                format!("Failed to capture cluster state: {e}"),
                LogSource::K8sMonitor,
                Metadata::new().with("error", e.to_string()),
            );
            return baseline;
        }
    };
    let events = match &baseline {
        Some(previous) => diff_snapshots(previous, &current),
        None => vec![initial_summary(&current)],
    };
    for event in events {
        store.log(event.level, event.message, LogSource::K8sMonitor, event.metadata);
    }
    Some(current)
}

/// Fetches the four listings concurrently. A failed listing degrades to an
/// empty collection; only when all four fail is the capture an error.
pub async fn fetch_snapshot(source: &dyn ClusterSource) -> Result<ClusterSnapshot, CaptureError> {
    let (pods, services, nodes, deployments) = tokio::join!(
        source.list_pods(),
        source.list_services(),
        source.list_nodes(),
        source.list_deployments(),
    );
    let mut first_error: Option<SourceError> = None;
    let mut failures = 0;
    let mut degrade = |kind: ResourceKind, e: SourceError| {
        tracing::warn!(error = %e, resource = %kind, operation = "fetch_cluster_state", "listing failed");
        failures += 1;
        first_error.get_or_insert(e);
    };
    let pods = pods.unwrap_or_else(|e| {
        degrade(ResourceKind::Pods, e);
        Vec::new()
    });
    let services = services.unwrap_or_else(|e| {
        degrade(ResourceKind::Services, e);
        Vec::new()
    });
    let nodes = nodes.unwrap_or_else(|e| {
        degrade(ResourceKind::Nodes, e);
        Vec::new()
    });
    let deployments = deployments.unwrap_or_else(|e| {
        degrade(ResourceKind::Deployments, e);
        Vec::new()
    });
    if failures == 4
        && let Some(e) = first_error
    {
        return Err(CaptureError::Unreachable(e));
    }
    Ok(ClusterSnapshot {
        timestamp: chrono::Utc::now(),
        pods,
        services,
        nodes,
        deployments,
    })
}

/// Message, level and metadata for a manual operation.
pub fn operation_event(
    operation: Operation,
    resource: &ResourceRef,
    details: Metadata,
) -> ClusterEvent {
    let message = match operation {
        Operation::Create => format!("Created {}: {}", resource.kind, resource.name),
        Operation::Delete => format!("Deleted {}: {}", resource.kind, resource.name),
        Operation::Update => format!("Updated {}: {}", resource.kind, resource.name),
        Operation::Scale => {
            let replicas = details
                .get("replicas")
                .map_or_else(|| "unknown".to_string(), ToString::to_string);
            format!(
                "Scaled {} {} to {} replicas",
                resource.kind, resource.name, replicas
            )
        }
        Operation::Restart => format!("Restarted {}: {}", resource.kind, resource.name),
    };
    let mut metadata = Metadata::new()
        .with("operation", operation.as_str())
        .with("resourceType", resource.kind.as_str())
        .with("resourceName", resource.name.as_str());
    metadata.merge(details);
    ClusterEvent {
        level: operation.level(),
        message,
        metadata,
    }
}
