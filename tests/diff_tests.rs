// Snapshot diff tests: per-kind events, severities and emission order

mod common;

use clusterwatch::models::*;
use clusterwatch::watcher::diff::{diff_snapshots, initial_summary};
use common::{deployment, node, pod, service, snapshot};

fn summary(events: &[clusterwatch::watcher::diff::ClusterEvent]) -> Vec<(LogLevel, String)> {
    events.iter().map(|e| (e.level, e.message.clone())).collect()
}

#[test]
fn test_restart_and_creation_are_the_only_events() {
    let previous = snapshot(vec![pod("a", "Running", 0)], vec![], vec![], vec![]);
    let current = snapshot(
        vec![pod("a", "Running", 1), pod("b", "Pending", 0)],
        vec![],
        vec![],
        vec![],
    );
    let events = diff_snapshots(&previous, &current);
    assert_eq!(
        summary(&events),
        vec![
            (LogLevel::Success, "Pod created: b in default".to_string()),
            (LogLevel::Warning, "Pod a restarted (1 times)".to_string()),
        ]
    );
    assert_eq!(events[1].metadata.get("restarts").and_then(MetaValue::as_i64), Some(1));
}

#[test]
fn test_identical_snapshots_produce_nothing() {
    let s = snapshot(
        vec![pod("a", "Running", 2)],
        vec![service("web", "ClusterIP")],
        vec![node("n1", "Ready")],
        vec![deployment("web", 3, 3)],
    );
    assert!(diff_snapshots(&s, &s.clone()).is_empty());
}

#[test]
fn test_pod_status_levels_follow_new_status() {
    let previous = snapshot(
        vec![
            pod("a", "Pending", 0),
            pod("b", "Running", 0),
            pod("c", "Running", 0),
        ],
        vec![],
        vec![],
        vec![],
    );
    let current = snapshot(
        vec![
            pod("a", "Running", 0),
            pod("b", "Pending", 0),
            pod("c", "CrashLoopBackOff", 0),
        ],
        vec![],
        vec![],
        vec![],
    );
    assert_eq!(
        summary(&diff_snapshots(&previous, &current)),
        vec![
            (LogLevel::Success, "Pod a: Pending → Running".to_string()),
            (LogLevel::Info, "Pod b: Running → Pending".to_string()),
            (LogLevel::Warning, "Pod c: Running → CrashLoopBackOff".to_string()),
        ]
    );
}

#[test]
fn test_restart_counter_reset_is_not_a_restart() {
    let previous = snapshot(vec![pod("a", "Running", 4)], vec![], vec![], vec![]);
    let current = snapshot(vec![pod("a", "Running", 0)], vec![], vec![], vec![]);
    assert!(diff_snapshots(&previous, &current).is_empty());
}

#[test]
fn test_node_departure_is_more_severe_than_pod_deletion() {
    let previous = snapshot(
        vec![pod("a", "Running", 0)],
        vec![],
        vec![node("n1", "Ready")],
        vec![],
    );
    let current = snapshot(vec![], vec![], vec![], vec![]);
    assert_eq!(
        summary(&diff_snapshots(&previous, &current)),
        vec![
            (LogLevel::Warning, "Pod deleted: a from default".to_string()),
            (LogLevel::Error, "Node left: n1".to_string()),
        ]
    );
}

#[test]
fn test_node_status_transitions() {
    let previous = snapshot(
        vec![],
        vec![],
        vec![node("n1", "Ready"), node("n2", "NotReady")],
        vec![],
    );
    let current = snapshot(
        vec![],
        vec![],
        vec![node("n1", "NotReady"), node("n2", "Ready"), node("n3", "Ready")],
        vec![],
    );
    assert_eq!(
        summary(&diff_snapshots(&previous, &current)),
        vec![
            (LogLevel::Success, "Node joined: n3".to_string()),
            (LogLevel::Error, "Node n1: Ready → NotReady".to_string()),
            (LogLevel::Success, "Node n2: NotReady → Ready".to_string()),
        ]
    );
}

#[test]
fn test_service_type_change() {
    let previous = snapshot(vec![], vec![service("web", "ClusterIP")], vec![], vec![]);
    let current = snapshot(vec![], vec![service("web", "NodePort")], vec![], vec![]);
    let events = diff_snapshots(&previous, &current);
    assert_eq!(
        summary(&events),
        vec![(LogLevel::Info, "Service web: type changed ClusterIP → NodePort".to_string())]
    );
    assert_eq!(
        events[0].metadata.get("currentType").and_then(MetaValue::as_str),
        Some("NodePort")
    );
}

#[test]
fn test_deployment_scaling_and_availability() {
    let previous = snapshot(vec![], vec![], vec![], vec![deployment("web", 2, 2)]);
    let scaled = snapshot(vec![], vec![], vec![], vec![deployment("web", 4, 2)]);
    assert_eq!(
        summary(&diff_snapshots(&previous, &scaled)),
        vec![(LogLevel::Info, "Deployment web: replicas 2 → 4".to_string())]
    );

    let partially = snapshot(vec![], vec![], vec![], vec![deployment("web", 4, 3)]);
    assert_eq!(
        summary(&diff_snapshots(&scaled, &partially)),
        vec![(LogLevel::Warning, "Deployment web: 3/4 pods available".to_string())]
    );

    let ready = snapshot(vec![], vec![], vec![], vec![deployment("web", 4, 4)]);
    assert_eq!(
        summary(&diff_snapshots(&partially, &ready)),
        vec![(LogLevel::Success, "Deployment web: 4/4 pods available".to_string())]
    );
}

#[test]
fn test_events_follow_kind_order_then_created_deleted_changed() {
    let previous = snapshot(
        vec![pod("old", "Running", 0), pod("same", "Pending", 0)],
        vec![service("gone", "ClusterIP")],
        vec![],
        vec![deployment("api", 1, 1)],
    );
    let current = snapshot(
        vec![pod("same", "Running", 0), pod("new", "Pending", 0)],
        vec![service("fresh", "LoadBalancer")],
        vec![node("n1", "Ready")],
        vec![],
    );
    let messages: Vec<String> = diff_snapshots(&previous, &current)
        .into_iter()
        .map(|e| e.message)
        .collect();
    assert_eq!(
        messages,
        vec![
            "Pod created: new in default",
            "Pod deleted: old from default",
            "Pod same: Pending → Running",
            "Service created: fresh (LoadBalancer)",
            "Service deleted: gone",
            "Node joined: n1",
            "Deployment deleted: api",
        ]
    );
}

#[test]
fn test_initial_summary_counts() {
    let s = snapshot(
        vec![pod("a", "Running", 0), pod("b", "Running", 0)],
        vec![service("web", "ClusterIP")],
        vec![node("n1", "Ready")],
        vec![],
    );
    let event = initial_summary(&s);
    assert_eq!(event.level, LogLevel::Success);
    assert_eq!(event.message, "Cluster monitoring started - 2 pods, 1 services");
    assert_eq!(event.metadata.get("nodes").and_then(MetaValue::as_i64), Some(1));
    assert_eq!(event.metadata.get("deployments").and_then(MetaValue::as_i64), Some(0));
}
