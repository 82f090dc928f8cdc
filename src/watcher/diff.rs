// Snapshot diffing: turns two consecutive cluster snapshots into labelled events.
// Order: pods, services, nodes, deployments; per kind: created, deleted, changed.

use std::collections::HashMap;

use crate::models::{ClusterSnapshot, Deployment, LogLevel, Metadata, Node, Pod, Service};

/// One change to be written to the log with source `k8s-monitor`.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterEvent {
    pub level: LogLevel,
    pub message: String,
    pub metadata: Metadata,
}

impl ClusterEvent {
    fn new(level: LogLevel, message: String, metadata: Metadata) -> Self {
        Self {
            level,
            message,
            metadata,
        }
    }
}

trait Named {
    fn name(&self) -> &str;
}

impl Named for Pod {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Service {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Node {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Deployment {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Event emitted for the first capture after monitoring starts.
pub fn initial_summary(snapshot: &ClusterSnapshot) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Success,
        format!(
            "Cluster monitoring started - {} pods, {} services",
            snapshot.pods.len(),
            snapshot.services.len()
        ),
        Metadata::new()
            .with("pods", snapshot.pods.len())
            .with("services", snapshot.services.len())
            .with("nodes", snapshot.nodes.len())
            .with("deployments", snapshot.deployments.len()),
    )
}

pub fn diff_snapshots(previous: &ClusterSnapshot, current: &ClusterSnapshot) -> Vec<ClusterEvent> {
    let mut events = Vec::new();
    diff_by_name(
        &previous.pods,
        &current.pods,
        &mut events,
        pod_created,
        pod_deleted,
        pod_changed,
    );
    diff_by_name(
        &previous.services,
        &current.services,
        &mut events,
        service_created,
        service_deleted,
        service_changed,
    );
    diff_by_name(
        &previous.nodes,
        &current.nodes,
        &mut events,
        node_joined,
        node_left,
        node_changed,
    );
    diff_by_name(
        &previous.deployments,
        &current.deployments,
        &mut events,
        deployment_created,
        deployment_deleted,
        deployment_changed,
    );
    events
}

/// Name-keyed diff of one collection. With duplicate names the last occurrence
/// is the one compared against.
fn diff_by_name<T: Named>(
    previous: &[T],
    current: &[T],
    events: &mut Vec<ClusterEvent>,
    created: fn(&T) -> ClusterEvent,
    deleted: fn(&T) -> ClusterEvent,
    changed: fn(&T, &T, &mut Vec<ClusterEvent>),
) {
    let prev_by_name: HashMap<&str, &T> = previous.iter().map(|r| (r.name(), r)).collect();
    let curr_by_name: HashMap<&str, &T> = current.iter().map(|r| (r.name(), r)).collect();

    events.extend(
        current
            .iter()
            .filter(|r| !prev_by_name.contains_key(r.name()))
            .map(created),
    );
    events.extend(
        previous
            .iter()
            .filter(|r| !curr_by_name.contains_key(r.name()))
            .map(deleted),
    );
    for curr in current {
        if let Some(prev) = prev_by_name.get(curr.name()) {
            changed(prev, curr, events);
        }
    }
}

fn pod_created(pod: &Pod) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Success,
        format!("Pod created: {} in {}", pod.name, pod.namespace),
        Metadata::new()
            .with("podName", pod.name.as_str())
            .with("namespace", pod.namespace.as_str())
            .with("status", pod.status.as_str()),
    )
}

fn pod_deleted(pod: &Pod) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Warning,
        format!("Pod deleted: {} from {}", pod.name, pod.namespace),
        Metadata::new()
            .with("podName", pod.name.as_str())
            .with("namespace", pod.namespace.as_str()),
    )
}

fn pod_status_level(status: &str) -> LogLevel {
    match status {
        "Running" => LogLevel::Success,
        "Pending" => LogLevel::Info,
        _ => LogLevel::Warning,
    }
}

fn pod_changed(prev: &Pod, curr: &Pod, events: &mut Vec<ClusterEvent>) {
    if prev.status != curr.status {
        events.push(ClusterEvent::new(
            pod_status_level(&curr.status),
            format!("Pod {}: {} → {}", curr.name, prev.status, curr.status),
            Metadata::new()
                .with("podName", curr.name.as_str())
                .with("namespace", curr.namespace.as_str())
                .with("previousStatus", prev.status.as_str())
                .with("currentStatus", curr.status.as_str()),
        ));
    }
    // A lower count means the pod was recreated under the same name, not restarted.
    if curr.restarts > prev.restarts {
        events.push(ClusterEvent::new(
            LogLevel::Warning,
            format!("Pod {} restarted ({} times)", curr.name, curr.restarts),
            Metadata::new()
                .with("podName", curr.name.as_str())
                .with("namespace", curr.namespace.as_str())
                .with("previousRestarts", prev.restarts)
                .with("restarts", curr.restarts),
        ));
    }
}

fn service_created(svc: &Service) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Success,
        format!("Service created: {} ({})", svc.name, svc.type_),
        Metadata::new()
            .with("serviceName", svc.name.as_str())
            .with("namespace", svc.namespace.as_str())
            .with("type", svc.type_.as_str())
            .with("clusterIP", svc.cluster_ip.as_str()),
    )
}

fn service_deleted(svc: &Service) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Warning,
        format!("Service deleted: {}", svc.name),
        Metadata::new()
            .with("serviceName", svc.name.as_str())
            .with("namespace", svc.namespace.as_str()),
    )
}

fn service_changed(prev: &Service, curr: &Service, events: &mut Vec<ClusterEvent>) {
    if prev.type_ != curr.type_ {
        events.push(ClusterEvent::new(
            LogLevel::Info,
            format!(
                "Service {}: type changed {} → {}",
                curr.name, prev.type_, curr.type_
            ),
            Metadata::new()
                .with("serviceName", curr.name.as_str())
                .with("namespace", curr.namespace.as_str())
                .with("previousType", prev.type_.as_str())
                .with("currentType", curr.type_.as_str()),
        ));
    }
}

fn node_joined(node: &Node) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Success,
        format!("Node joined: {}", node.name),
        Metadata::new()
            .with("nodeName", node.name.as_str())
            .with("roles", node.roles.as_str()),
    )
}

fn node_left(node: &Node) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Error,
        format!("Node left: {}", node.name),
        Metadata::new().with("nodeName", node.name.as_str()),
    )
}

fn node_changed(prev: &Node, curr: &Node, events: &mut Vec<ClusterEvent>) {
    if prev.status != curr.status {
        let level = if curr.status == "Ready" {
            LogLevel::Success
        } else {
            LogLevel::Error
        };
        events.push(ClusterEvent::new(
            level,
            format!("Node {}: {} → {}", curr.name, prev.status, curr.status),
            Metadata::new()
                .with("nodeName", curr.name.as_str())
                .with("previousStatus", prev.status.as_str())
                .with("currentStatus", curr.status.as_str()),
        ));
    }
}

fn deployment_created(dep: &Deployment) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Success,
        format!("Deployment created: {} ({} replicas)", dep.name, dep.replicas),
        Metadata::new()
            .with("deploymentName", dep.name.as_str())
            .with("namespace", dep.namespace.as_str())
            .with("replicas", dep.replicas),
    )
}

fn deployment_deleted(dep: &Deployment) -> ClusterEvent {
    ClusterEvent::new(
        LogLevel::Warning,
        format!("Deployment deleted: {}", dep.name),
        Metadata::new()
            .with("deploymentName", dep.name.as_str())
            .with("namespace", dep.namespace.as_str()),
    )
}

fn deployment_changed(prev: &Deployment, curr: &Deployment, events: &mut Vec<ClusterEvent>) {
    if prev.replicas != curr.replicas {
        events.push(ClusterEvent::new(
            LogLevel::Info,
            format!(
                "Deployment {}: replicas {} → {}",
                curr.name, prev.replicas, curr.replicas
            ),
            Metadata::new()
                .with("deploymentName", curr.name.as_str())
                .with("namespace", curr.namespace.as_str())
                .with("previousReplicas", prev.replicas)
                .with("currentReplicas", curr.replicas),
        ));
    }
    if prev.available != curr.available {
        let level = if curr.available == curr.replicas {
            LogLevel::Success
        } else {
            LogLevel::Warning
        };
        events.push(ClusterEvent::new(
            level,
            format!(
                "Deployment {}: {}/{} pods available",
                curr.name, curr.available, curr.replicas
            ),
            Metadata::new()
                .with("deploymentName", curr.name.as_str())
                .with("namespace", curr.namespace.as_str())
                .with("previousAvailable", prev.available)
                .with("available", curr.available)
                .with("desired", curr.replicas),
        ));
    }
}
