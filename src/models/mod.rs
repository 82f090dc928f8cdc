// Domain models: log stream, filters, statistics, cluster resources

mod cluster;
mod filter;
mod log;
mod operation;
mod stats;

pub use cluster::{ClusterSnapshot, Deployment, Node, Pod, Service};
pub use filter::{ALL, FilterState, FilterUpdate};
pub use log::{LogEntry, LogLevel, LogSource, MetaValue, Metadata};
pub use operation::{Operation, ResourceRef};
pub use stats::{LevelCounts, LogStats, SourceCounts};

/// Rejected values at the string boundary (HTTP bodies, config, query params).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unknown log level: {0:?}")]
    UnknownLevel(String),
    #[error("unknown log source: {0:?}")]
    UnknownSource(String),
    #[error("unknown filter kind: {0:?}")]
    UnknownFilterKind(String),
    #[error("unknown operation: {0:?}")]
    UnknownOperation(String),
    #[error("unknown balancing algorithm: {0:?}")]
    UnknownAlgorithm(String),
}
