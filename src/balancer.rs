// Load-balancing simulator: three backend pods behind one of four selection rules.
// Every action is recorded in the log store with source `loadbalancer`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::log_store::LogStore;
use crate::models::{LogLevel, LogSource, Metadata, ModelError};

const POD_COUNT: u32 = 3;
/// Response times kept for the running average.
const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    #[default]
    RoundRobin,
    LeastConnections,
    Random,
    IpHash,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "round-robin",
            Algorithm::LeastConnections => "least-connections",
            Algorithm::Random => "random",
            Algorithm::IpHash => "ip-hash",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Algorithm::RoundRobin => "Round Robin",
            Algorithm::LeastConnections => "Least Connections",
            Algorithm::Random => "Random",
            Algorithm::IpHash => "IP Hash",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "round-robin" => Ok(Algorithm::RoundRobin),
            "least-connections" => Ok(Algorithm::LeastConnections),
            "random" => Ok(Algorithm::Random),
            "ip-hash" => Ok(Algorithm::IpHash),
            _ => Err(ModelError::UnknownAlgorithm(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendPod {
    pub id: u32,
    pub active: bool,
    pub requests: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancerState {
    pub algorithm: Algorithm,
    pub total_requests: u64,
    pub pods: Vec<BackendPod>,
    pub average_response_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOutcome {
    pub request: u64,
    pub pod: u32,
    pub response_ms: u32,
}

struct Inner {
    algorithm: Algorithm,
    pods: Vec<BackendPod>,
    cursor: usize,
    total_requests: u64,
    response_times: VecDeque<u32>,
}

impl Inner {
    fn new() -> Self {
        Self {
            algorithm: Algorithm::default(),
            pods: (1..=POD_COUNT)
                .map(|id| BackendPod {
                    id,
                    active: true,
                    requests: 0,
                })
                .collect(),
            cursor: 0,
            total_requests: 0,
            response_times: VecDeque::with_capacity(RESPONSE_WINDOW),
        }
    }

    fn active_ids(&self) -> Vec<u32> {
        self.pods.iter().filter(|p| p.active).map(|p| p.id).collect()
    }

    /// Picks a pod among the active ones. `random_index` is only consulted by
    /// [`Algorithm::Random`] and must return a value below its argument.
    fn select(&mut self, random_index: impl FnOnce(usize) -> usize) -> Option<u32> {
        let active = self.active_ids();
        if active.is_empty() {
            return None;
        }
        let picked = match self.algorithm {
            Algorithm::RoundRobin => {
                self.cursor = (self.cursor + 1) % active.len();
                active[self.cursor]
            }
            Algorithm::LeastConnections => self
                .pods
                .iter()
                .filter(|p| p.active)
                .min_by_key(|p| p.requests)
                .map_or(active[0], |p| p.id),
            Algorithm::Random => active[random_index(active.len()) % active.len()],
            Algorithm::IpHash => active[(self.total_requests % active.len() as u64) as usize],
        };
        Some(picked)
    }

    fn record(&mut self, pod: u32, response_ms: u32) -> u64 {
        self.total_requests += 1;
        if let Some(p) = self.pods.iter_mut().find(|p| p.id == pod) {
            p.requests += 1;
        }
        if self.response_times.len() == RESPONSE_WINDOW {
            self.response_times.pop_front();
        }
        self.response_times.push_back(response_ms);
        self.total_requests
    }

    fn state(&self) -> BalancerState {
        let average_response_ms = (!self.response_times.is_empty()).then(|| {
            self.response_times.iter().map(|&t| f64::from(t)).sum::<f64>()
                / self.response_times.len() as f64
        });
        BalancerState {
            algorithm: self.algorithm,
            total_requests: self.total_requests,
            pods: self.pods.clone(),
            average_response_ms,
        }
    }

    fn context(&self) -> Metadata {
        Metadata::new()
            .with("algorithm", self.algorithm.as_str())
            .with("totalRequests", self.total_requests)
            .with("activePods", self.active_ids().len())
    }
}

/// Uniform index below `n` (`n > 0`). A v4 UUID carries 122 random bits from
/// the OS generator, so its value modulo a small `n` has negligible bias.
fn random_below(n: usize) -> usize {
    (uuid::Uuid::new_v4().as_u128() % n as u128) as usize
}

pub struct LoadBalancer {
    store: Arc<LogStore>,
    inner: Mutex<Inner>,
}

impl LoadBalancer {
    pub fn new(store: Arc<LogStore>) -> Self {
        Self {
            store,
            inner: Mutex::new(Inner::new()),
        }
    }

    pub fn state(&self) -> BalancerState {
        self.inner.lock().state()
    }

    pub fn set_algorithm(&self, algorithm: Algorithm) {
        let context = {
            let mut inner = self.inner.lock();
            inner.algorithm = algorithm;
            inner.context()
        };
        self.emit(
            LogLevel::Info,
            format!("Switched to {} algorithm", algorithm.label()),
            context,
        );
    }

    /// Routes one simulated request. `None` when every pod is disabled.
    pub fn send_request(&self) -> Option<RequestOutcome> {
        self.route(random_below)
    }

    fn route(&self, random_index: impl FnOnce(usize) -> usize) -> Option<RequestOutcome> {
        let (outcome, context) = {
            let mut inner = self.inner.lock();
            match inner.select(random_index) {
                Some(pod) => {
                    let response_ms = 50 + random_below(50) as u32;
                    let request = inner.record(pod, response_ms);
                    (
                        Some(RequestOutcome {
                            request,
                            pod,
                            response_ms,
                        }),
                        inner.context(),
                    )
                }
                None => (None, inner.context()),
            }
        };
        match outcome {
            Some(o) => self.emit(
                LogLevel::Success,
                format!("Request #{} → Pod {} ({}ms)", o.request, o.pod, o.response_ms),
                context,
            ),
            None => self.emit(LogLevel::Error, "No active pods available!".into(), context),
        }
        outcome
    }

    /// Sends `count` requests, `spacing` apart. Stops early if no pod is active.
    pub async fn send_burst(&self, count: usize, spacing: Duration) -> Vec<RequestOutcome> {
        let mut outcomes = Vec::with_capacity(count);
        for i in 0..count {
            if i > 0 {
                tokio::time::sleep(spacing).await;
            }
            match self.send_request() {
                Some(o) => outcomes.push(o),
                None => break,
            }
        }
        outcomes
    }

    /// Flips a pod between active and disabled. Returns the new state, or
    /// `None` for an unknown pod id.
    pub fn toggle_pod(&self, id: u32) -> Option<bool> {
        let (active, none_left, context) = {
            let mut inner = self.inner.lock();
            let pod = inner.pods.iter_mut().find(|p| p.id == id)?;
            pod.active = !pod.active;
            let active = pod.active;
            (active, inner.active_ids().is_empty(), inner.context())
        };
        if active {
            self.emit(
                LogLevel::Success,
                format!("Pod {id} is now ACTIVE"),
                context.clone(),
            );
        } else {
            self.emit(
                LogLevel::Warning,
                format!("Pod {id} is now DISABLED"),
                context.clone(),
            );
        }
        if none_left {
            self.emit(
                LogLevel::Error,
                "WARNING: All pods are disabled! Service unavailable!".into(),
                context,
            );
        }
        Some(active)
    }

    /// Re-enables every pod and zeroes the counters; the algorithm is kept.
    pub fn reset(&self) {
        let context = {
            let mut inner = self.inner.lock();
            let algorithm = inner.algorithm;
            *inner = Inner::new();
            inner.algorithm = algorithm;
            inner.context()
        };
        self.emit(LogLevel::Info, "Demo reset successfully".into(), context);
    }

    fn emit(&self, level: LogLevel, message: String, context: Metadata) {
        self.store
            .log(level, message, LogSource::LoadBalancer, context);
    }
}
