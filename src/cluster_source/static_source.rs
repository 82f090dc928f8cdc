// In-memory source with a settable cluster state (demos, tests, offline runs)

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{ClusterSource, ResourceKind, SourceError};
use crate::models::{ClusterSnapshot, Deployment, Node, Pod, Service};

#[derive(Debug, Default)]
struct Listing {
    pods: Vec<Pod>,
    services: Vec<Service>,
    nodes: Vec<Node>,
    deployments: Vec<Deployment>,
    unreachable: Vec<ResourceKind>,
}

/// Serves whatever state was last set. Individual kinds can be marked unreachable.
#[derive(Debug, Default)]
pub struct StaticClusterSource {
    listing: Mutex<Listing>,
    /// Number of `list_pods` calls, i.e. poll cycles that reached the source.
    polls: AtomicUsize,
}

impl StaticClusterSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_snapshot(&self, snapshot: ClusterSnapshot) {
        let mut listing = self.listing.lock();
        listing.pods = snapshot.pods;
        listing.services = snapshot.services;
        listing.nodes = snapshot.nodes;
        listing.deployments = snapshot.deployments;
    }

    pub fn set_pods(&self, pods: Vec<Pod>) {
        self.listing.lock().pods = pods;
    }

    pub fn set_services(&self, services: Vec<Service>) {
        self.listing.lock().services = services;
    }

    pub fn set_nodes(&self, nodes: Vec<Node>) {
        self.listing.lock().nodes = nodes;
    }

    pub fn set_deployments(&self, deployments: Vec<Deployment>) {
        self.listing.lock().deployments = deployments;
    }

    /// Make listings of `kind` fail (or succeed again).
    pub fn set_unreachable(&self, kind: ResourceKind, unreachable: bool) {
        let mut listing = self.listing.lock();
        listing.unreachable.retain(|k| *k != kind);
        if unreachable {
            listing.unreachable.push(kind);
        }
    }

    pub fn set_all_unreachable(&self, unreachable: bool) {
        for kind in [
            ResourceKind::Pods,
            ResourceKind::Services,
            ResourceKind::Nodes,
            ResourceKind::Deployments,
        ] {
            self.set_unreachable(kind, unreachable);
        }
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    fn check(&self, kind: ResourceKind) -> Result<(), SourceError> {
        if self.listing.lock().unreachable.contains(&kind) {
            return Err(SourceError::Unavailable {
                kind,
                reason: "marked unreachable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ClusterSource for StaticClusterSource {
    async fn list_pods(&self) -> Result<Vec<Pod>, SourceError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.check(ResourceKind::Pods)?;
        Ok(self.listing.lock().pods.clone())
    }

    async fn list_services(&self) -> Result<Vec<Service>, SourceError> {
        self.check(ResourceKind::Services)?;
        Ok(self.listing.lock().services.clone())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
        self.check(ResourceKind::Nodes)?;
        Ok(self.listing.lock().nodes.clone())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, SourceError> {
        self.check(ResourceKind::Deployments)?;
        Ok(self.listing.lock().deployments.clone())
    }
}
