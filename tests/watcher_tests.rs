// Watcher tests: capture cycles, degraded listings, start/stop lifecycle, manual operations

mod common;

use clusterwatch::cluster_source::{ResourceKind, StaticClusterSource};
use clusterwatch::models::*;
use clusterwatch::watcher::{
    CaptureError, ClusterWatcher, WatcherConfig, capture_cycle, fetch_snapshot, operation_event,
};
use common::{deployment, memory_log_store, messages, node, pod, service, snapshot};
use std::sync::Arc;
use tokio::time::{Duration, sleep};

fn seeded_source() -> Arc<StaticClusterSource> {
    let source = Arc::new(StaticClusterSource::new());
    source.set_snapshot(snapshot(
        vec![pod("web-1", "Running", 0)],
        vec![service("web", "ClusterIP")],
        vec![node("n1", "Ready")],
        vec![deployment("web", 1, 1)],
    ));
    source
}

#[tokio::test]
async fn test_first_capture_logs_summary_then_diffs() {
    let (store, _) = memory_log_store(50).await;
    let source = seeded_source();

    let baseline = capture_cycle(source.as_ref(), &store, None).await;
    assert!(baseline.is_some());
    let first = &store.all_logs()[0];
    assert_eq!(first.message, "Cluster monitoring started - 1 pods, 1 services");
    assert_eq!(first.source, LogSource::K8sMonitor);

    source.set_pods(vec![pod("web-1", "Running", 2)]);
    let baseline = capture_cycle(source.as_ref(), &store, baseline).await;
    assert_eq!(store.all_logs()[0].message, "Pod web-1 restarted (2 times)");
    assert_eq!(store.all_logs()[0].level, LogLevel::Warning);

    // Nothing changed: nothing logged.
    let before = store.len();
    capture_cycle(source.as_ref(), &store, baseline).await;
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn test_unreachable_source_keeps_baseline() {
    let (store, _) = memory_log_store(50).await;
    let source = seeded_source();
    let baseline = capture_cycle(source.as_ref(), &store, None).await;

    source.set_all_unreachable(true);
    let kept = capture_cycle(source.as_ref(), &store, baseline.clone()).await;
    assert_eq!(kept, baseline);
    let failure = &store.all_logs()[0];
    assert_eq!(failure.level, LogLevel::Error);
    assert!(failure.message.starts_with("Failed to capture cluster state: "));

    // Recovery with an unchanged cluster reports no deletions.
    source.set_all_unreachable(false);
    let before = store.len();
    capture_cycle(source.as_ref(), &store, kept).await;
    assert_eq!(store.len(), before);
}

#[tokio::test]
async fn test_fetch_snapshot_degrades_single_listing() {
    let source = seeded_source();
    source.set_unreachable(ResourceKind::Services, true);
    let snap = fetch_snapshot(source.as_ref()).await.unwrap();
    assert!(snap.services.is_empty());
    assert_eq!(snap.pods.len(), 1);
    assert_eq!(snap.nodes.len(), 1);
    assert_eq!(snap.deployments.len(), 1);

    source.set_all_unreachable(true);
    assert!(matches!(
        fetch_snapshot(source.as_ref()).await,
        Err(CaptureError::Unreachable(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent_and_stop_halts_polling() {
    let (store, _) = memory_log_store(50).await;
    let source = seeded_source();
    let watcher = ClusterWatcher::new(
        source.clone(),
        store.clone(),
        WatcherConfig {
            poll_interval_ms: 1000,
        },
    );

    assert!(!watcher.is_monitoring());
    assert!(watcher.start());
    assert!(!watcher.start());
    assert!(watcher.is_monitoring());

    sleep(Duration::from_millis(2_500)).await;
    assert_eq!(source.polls(), 3);
    let logged = messages(&store.all_logs());
    assert_eq!(
        logged,
        vec![
            "Cluster monitoring started - 1 pods, 1 services",
            "Starting Kubernetes cluster monitoring",
        ]
    );

    assert!(watcher.stop());
    assert!(!watcher.stop());
    assert!(!watcher.is_monitoring());
    let polls = source.polls();
    sleep(Duration::from_millis(5_000)).await;
    assert_eq!(source.polls(), polls);
    assert_eq!(store.all_logs()[0].message, "Stopped Kubernetes cluster monitoring");
}

#[tokio::test(start_paused = true)]
async fn test_restart_begins_with_fresh_summary() {
    let (store, _) = memory_log_store(50).await;
    let source = seeded_source();
    let watcher = ClusterWatcher::new(
        source.clone(),
        store.clone(),
        WatcherConfig {
            poll_interval_ms: 1000,
        },
    );
    watcher.start();
    sleep(Duration::from_millis(500)).await;
    watcher.stop();

    source.set_pods(vec![]);
    watcher.start();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(
        store.all_logs()[0].message,
        "Cluster monitoring started - 0 pods, 1 services"
    );
    watcher.stop();
}

#[tokio::test]
async fn test_log_operation_records_scale_with_replicas() {
    let (store, _) = memory_log_store(50).await;
    let watcher = ClusterWatcher::new(
        seeded_source(),
        store.clone(),
        WatcherConfig {
            poll_interval_ms: 1000,
        },
    );
    let entry = watcher.log_operation(
        Operation::Scale,
        &ResourceRef::new("deployment", "web"),
        Metadata::new().with("replicas", 5u32),
    );
    assert_eq!(entry.message, "Scaled deployment web to 5 replicas");
    assert_eq!(entry.level, LogLevel::Info);
    assert_eq!(entry.source, LogSource::K8sMonitor);
    assert_eq!(entry.metadata.get("operation").and_then(MetaValue::as_str), Some("scale"));
    assert_eq!(
        entry.metadata.get("resourceType").and_then(MetaValue::as_str),
        Some("deployment")
    );
    assert_eq!(store.all_logs()[0], entry);
}

#[test]
fn test_operation_event_messages_and_levels() {
    let pod_ref = ResourceRef::new("pod", "web-1");
    let deleted = operation_event(Operation::Delete, &pod_ref, Metadata::new());
    assert_eq!(deleted.message, "Deleted pod: web-1");
    assert_eq!(deleted.level, LogLevel::Warning);

    let created = operation_event(Operation::Create, &pod_ref, Metadata::new());
    assert_eq!(created.level, LogLevel::Success);

    let scaled = operation_event(
        Operation::Scale,
        &ResourceRef::new("deployment", "api"),
        Metadata::new(),
    );
    assert_eq!(scaled.message, "Scaled deployment api to unknown replicas");

    let restarted = operation_event(
        Operation::Restart,
        &pod_ref,
        Metadata::new().with("reason", "manual"),
    );
    assert_eq!(restarted.message, "Restarted pod: web-1");
    assert_eq!(restarted.metadata.get("reason").and_then(MetaValue::as_str), Some("manual"));
}
