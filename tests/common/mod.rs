// Shared test helpers

#![allow(dead_code)]

use clusterwatch::kv_store::{KeyValueStore, MemoryStore};
use clusterwatch::log_store::{LogStore, LogStoreOptions};
use clusterwatch::models::*;
use std::sync::Arc;

pub const LOG_KEY: &str = "k8s-dashboard-logs";

pub fn options(max_logs: usize) -> LogStoreOptions {
    LogStoreOptions {
        key: LOG_KEY.into(),
        max_logs,
    }
}

/// Log store over a fresh in-memory backend. The backend is returned too so
/// tests can inspect what was persisted.
pub async fn memory_log_store(max_logs: usize) -> (Arc<LogStore>, Arc<MemoryStore>) {
    let backend = Arc::new(MemoryStore::new());
    let storage: Arc<dyn KeyValueStore> = backend.clone();
    let store = Arc::new(LogStore::open(storage, options(max_logs)).await);
    (store, backend)
}

pub fn pod(name: &str, status: &str, restarts: u32) -> Pod {
    Pod {
        name: name.into(),
        namespace: "default".into(),
        status: status.into(),
        restarts,
    }
}

pub fn service(name: &str, type_: &str) -> Service {
    Service {
        name: name.into(),
        namespace: "default".into(),
        type_: type_.into(),
        cluster_ip: "10.0.0.1".into(),
    }
}

pub fn node(name: &str, status: &str) -> Node {
    Node {
        name: name.into(),
        status: status.into(),
        roles: "worker".into(),
    }
}

pub fn deployment(name: &str, replicas: u32, available: u32) -> Deployment {
    Deployment {
        name: name.into(),
        namespace: "default".into(),
        replicas,
        available,
    }
}

pub fn snapshot(
    pods: Vec<Pod>,
    services: Vec<Service>,
    nodes: Vec<Node>,
    deployments: Vec<Deployment>,
) -> ClusterSnapshot {
    ClusterSnapshot {
        timestamp: chrono::Utc::now(),
        pods,
        services,
        nodes,
        deployments,
    }
}

pub fn messages(entries: &[LogEntry]) -> Vec<String> {
    entries.iter().map(|e| e.message.clone()).collect()
}
