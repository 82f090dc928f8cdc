// Cluster bridge client (GET {base}/api/{pods,services,nodes,deployments})

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::{ClusterSource, SourceError};
use crate::models::{Deployment, Node, Pod, Service};
use crate::version::USER_AGENT;

pub struct HttpClusterSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClusterSource {
    pub fn new(base_url: &str, request_timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SourceError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }
        response
            .json::<T>()
            .await
            .map_err(|source| SourceError::Decode { url, source })
    }
}

/// Counts arrive as strings from `kubectl` output ("3", or "3 (5m ago)") or as numbers.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Count {
    Number(u64),
    Text(String),
}

impl Count {
    fn value(&self) -> u32 {
        match self {
            Count::Number(n) => u32::try_from(*n).unwrap_or(u32::MAX),
            Count::Text(s) => parse_leading_count(s),
        }
    }
}

impl Default for Count {
    fn default() -> Self {
        Count::Number(0)
    }
}

/// Leading decimal digits of `s`; 0 when there are none.
pub(crate) fn parse_leading_count(s: &str) -> u32 {
    let digits: String = s.trim().chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(0)
}

/// `"available/desired"` as printed in the READY column.
pub(crate) fn parse_ready(ready: &str) -> (u32, u32) {
    match ready.split_once('/') {
        Some((available, desired)) => (parse_leading_count(available), parse_leading_count(desired)),
        None => (0, 0),
    }
}

#[derive(Debug, Deserialize)]
struct BridgePod {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    restarts: Count,
}

#[derive(Debug, Deserialize)]
struct BridgeService {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(rename = "type", default)]
    type_: String,
    #[serde(rename = "clusterIP", default)]
    cluster_ip: String,
}

#[derive(Debug, Deserialize)]
struct BridgeNode {
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    roles: String,
}

#[derive(Debug, Deserialize)]
struct BridgeDeployment {
    name: String,
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    ready: String,
}

#[async_trait]
impl ClusterSource for HttpClusterSource {
    async fn list_pods(&self) -> Result<Vec<Pod>, SourceError> {
        let pods: Vec<BridgePod> = self.get_json("/api/pods").await?;
        Ok(pods
            .into_iter()
            .map(|p| Pod {
                restarts: p.restarts.value(),
                name: p.name,
                namespace: p.namespace,
                status: p.status,
            })
            .collect())
    }

    async fn list_services(&self) -> Result<Vec<Service>, SourceError> {
        let services: Vec<BridgeService> = self.get_json("/api/services").await?;
        Ok(services
            .into_iter()
            .map(|s| Service {
                name: s.name,
                namespace: s.namespace,
                type_: s.type_,
                cluster_ip: s.cluster_ip,
            })
            .collect())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
        let nodes: Vec<BridgeNode> = self.get_json("/api/nodes").await?;
        Ok(nodes
            .into_iter()
            .map(|n| Node {
                name: n.name,
                status: n.status,
                roles: n.roles,
            })
            .collect())
    }

    async fn list_deployments(&self) -> Result<Vec<Deployment>, SourceError> {
        let deployments: Vec<BridgeDeployment> = self.get_json("/api/deployments").await?;
        Ok(deployments
            .into_iter()
            .map(|d| {
                let (available, replicas) = parse_ready(&d.ready);
                Deployment {
                    name: d.name,
                    namespace: d.namespace,
                    replicas,
                    available,
                }
            })
            .collect())
    }
}
