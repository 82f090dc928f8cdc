// Cluster data source: the four resource listings the watcher polls

mod http;
mod static_source;

pub use http::HttpClusterSource;
pub use static_source::StaticClusterSource;

use async_trait::async_trait;
use std::fmt;

use crate::models::{Deployment, Node, Pod, Service};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Pods,
    Services,
    Nodes,
    Deployments,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Pods => "pods",
            ResourceKind::Services => "services",
            ResourceKind::Nodes => "nodes",
            ResourceKind::Deployments => "deployments",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("invalid response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{kind} unavailable: {reason}")]
    Unavailable { kind: ResourceKind, reason: String },
}

#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_pods(&self) -> Result<Vec<Pod>, SourceError>;
    async fn list_services(&self) -> Result<Vec<Service>, SourceError>;
    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError>;
    async fn list_deployments(&self) -> Result<Vec<Deployment>, SourceError>;
}
