// Log stream statistics

use serde::{Deserialize, Serialize};

use super::{LogLevel, LogSource};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelCounts {
    pub info: usize,
    pub success: usize,
    pub warning: usize,
    pub error: usize,
}

impl LevelCounts {
    pub fn record(&mut self, level: LogLevel) {
        match level {
            LogLevel::Info => self.info += 1,
            LogLevel::Success => self.success += 1,
            LogLevel::Warning => self.warning += 1,
            LogLevel::Error => self.error += 1,
        }
    }

    pub fn get(&self, level: LogLevel) -> usize {
        match level {
            LogLevel::Info => self.info,
            LogLevel::Success => self.success,
            LogLevel::Warning => self.warning,
            LogLevel::Error => self.error,
        }
    }

    pub fn total(&self) -> usize {
        self.info + self.success + self.warning + self.error
    }
}

/// Counts per producer. Every [`LogSource`] has its own bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceCounts {
    pub dashboard: usize,
    pub k8s_monitor: usize,
    pub loadbalancer: usize,
    pub system: usize,
}

impl SourceCounts {
    pub fn record(&mut self, source: LogSource) {
        match source {
            LogSource::Dashboard => self.dashboard += 1,
            LogSource::K8sMonitor => self.k8s_monitor += 1,
            LogSource::LoadBalancer => self.loadbalancer += 1,
            LogSource::System => self.system += 1,
        }
    }

    pub fn get(&self, source: LogSource) -> usize {
        match source {
            LogSource::Dashboard => self.dashboard,
            LogSource::K8sMonitor => self.k8s_monitor,
            LogSource::LoadBalancer => self.loadbalancer,
            LogSource::System => self.system,
        }
    }
}

/// Summary of the whole buffer (filters ignored).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogStats {
    pub total: usize,
    /// Entries created within the hour before the stats call.
    pub last_hour: usize,
    pub by_level: LevelCounts,
    pub by_source: SourceCounts,
}
