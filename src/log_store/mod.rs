// Unified log store: bounded newest-first buffer shared by every producer.
// Filtering is a view; persistence is driven by the persister task through `flush`.

mod subscribers;

pub use subscribers::{LogCallback, Subscription};

use chrono::{TimeDelta, Utc};
use parking_lot::{ReentrantMutex, RwLock};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Notify;

use crate::config::StorageConfig;
use crate::kv_store::KeyValueStore;
use crate::models::{
    FilterState, FilterUpdate, LogEntry, LogLevel, LogSource, LogStats, Metadata,
};
use subscribers::Subscribers;

/// Buffer and persistence settings.
#[derive(Debug, Clone)]
pub struct LogStoreOptions {
    /// Storage key the buffer is saved under.
    pub key: String,
    pub max_logs: usize,
}

impl Default for LogStoreOptions {
    fn default() -> Self {
        Self {
            key: "k8s-dashboard-logs".into(),
            max_logs: 500,
        }
    }
}

impl From<&StorageConfig> for LogStoreOptions {
    fn from(config: &StorageConfig) -> Self {
        Self {
            key: config.key.clone(),
            max_logs: config.max_logs,
        }
    }
}

/// Result of one [`LogStore::flush`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing changed since the last successful write.
    Clean,
    Written { entries: usize },
    /// First write hit the quota; the buffer was halved and the retry succeeded.
    Shrunk { entries: usize },
    /// Write failed (after the quota retry, if any). The error was logged and dropped.
    Failed,
}

/// Full-buffer export, ready to be served as a download.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogExport {
    pub file_name: String,
    pub entries: usize,
    /// Pretty-printed JSON array, newest first.
    pub contents: String,
}

struct State {
    entries: VecDeque<LogEntry>,
    filter: FilterState,
    /// Bumped on every buffer change; compared against the persisted revision.
    revision: u64,
    /// Id for the next entry. Assigned under the write lock together with the
    /// timestamp, so buffer order, id order and time order agree.
    next_id: u64,
}

impl State {
    fn filtered(&self) -> Vec<LogEntry> {
        if self.filter.is_default() {
            return self.entries.iter().cloned().collect();
        }
        let search = self.filter.search.to_lowercase();
        self.entries
            .iter()
            .filter(|e| self.filter.matches_with(e, &search))
            .cloned()
            .collect()
    }
}

pub struct LogStore {
    state: RwLock<State>,
    subscribers: Subscribers,
    /// Held from a mutation through its notification so subscribers see
    /// updates in buffer order. Reentrant: a callback may log again.
    notify_order: ReentrantMutex<()>,
    storage: Arc<dyn KeyValueStore>,
    options: LogStoreOptions,
    save_requested: Notify,
    /// Last revision written to storage. Also serialises flushes.
    persisted_revision: tokio::sync::Mutex<u64>,
}

impl LogStore {
    /// Loads the persisted buffer (missing or corrupt data yields an empty buffer).
    pub async fn open(storage: Arc<dyn KeyValueStore>, options: LogStoreOptions) -> Self {
        let entries = load_entries(storage.as_ref(), &options).await;
        let next_id = entries.iter().map(|e| e.id).max().map_or(0, |id| id + 1);
        Self {
            state: RwLock::new(State {
                entries: entries.into(),
                filter: FilterState::default(),
                revision: 0,
                next_id,
            }),
            subscribers: Subscribers::default(),
            notify_order: ReentrantMutex::new(()),
            storage,
            options,
            save_requested: Notify::new(),
            persisted_revision: tokio::sync::Mutex::new(0),
        }
    }

    pub fn max_logs(&self) -> usize {
        self.options.max_logs
    }

    pub fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        source: LogSource,
        metadata: Metadata,
    ) -> LogEntry {
        let message = message.into();
        let order = self.notify_order.lock();
        let entry = {
            let mut state = self.state.write();
            let entry = LogEntry {
                id: state.next_id,
                timestamp: Utc::now(),
                level,
                message,
                source,
                metadata,
            };
            state.next_id += 1;
            state.entries.push_front(entry.clone());
            state.entries.truncate(self.options.max_logs);
            state.revision += 1;
            entry
        };
        self.publish(Some(&entry));
        drop(order);
        self.save_requested.notify_one();
        mirror_to_console(&entry);
        entry
    }

    pub fn info(&self, message: impl Into<String>, source: LogSource, metadata: Metadata) -> LogEntry {
        self.log(LogLevel::Info, message, source, metadata)
    }

    pub fn success(
        &self,
        message: impl Into<String>,
        source: LogSource,
        metadata: Metadata,
    ) -> LogEntry {
        self.log(LogLevel::Success, message, source, metadata)
    }

    pub fn warning(
        &self,
        message: impl Into<String>,
        source: LogSource,
        metadata: Metadata,
    ) -> LogEntry {
        self.log(LogLevel::Warning, message, source, metadata)
    }

    pub fn error(&self, message: impl Into<String>, source: LogSource, metadata: Metadata) -> LogEntry {
        self.log(LogLevel::Error, message, source, metadata)
    }

    /// Entries matching the current filter, newest first. Always a fresh vector.
    pub fn filtered_logs(&self) -> Vec<LogEntry> {
        self.state.read().filtered()
    }

    /// Every entry regardless of filters, newest first.
    pub fn all_logs(&self) -> Vec<LogEntry> {
        self.state.read().entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn filter_state(&self) -> FilterState {
        self.state.read().filter.clone()
    }

    pub fn set_filter(&self, update: FilterUpdate) {
        let _order = self.notify_order.lock();
        self.state.write().filter.apply(update);
        self.publish(None);
    }

    pub fn clear_filters(&self) {
        let _order = self.notify_order.lock();
        self.state.write().filter = FilterState::default();
        self.publish(None);
    }

    /// Empties the buffer, writes the empty state, notifies, then records the
    /// clear itself as a `system` entry.
    pub async fn clear_logs(&self) {
        {
            let mut state = self.state.write();
            state.entries.clear();
            state.revision += 1;
        }
        self.flush().await;
        self.publish_ordered(None);
        self.info("Logs cleared", LogSource::System, Metadata::new());
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[LogEntry], Option<&LogEntry>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribers.add(Arc::new(callback))
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn stats(&self) -> LogStats {
        let cutoff = Utc::now() - TimeDelta::hours(1);
        let state = self.state.read();
        let mut stats = LogStats {
            total: state.entries.len(),
            ..LogStats::default()
        };
        for entry in &state.entries {
            if entry.timestamp > cutoff {
                stats.last_hour += 1;
            }
            stats.by_level.record(entry.level);
            stats.by_source.record(entry.source);
        }
        stats
    }

    /// Serializes the full buffer (filters ignored) and records the export.
    pub fn export_logs(&self) -> anyhow::Result<LogExport> {
        let (entries, contents) = {
            let state = self.state.read();
            (
                state.entries.len(),
                serde_json::to_string_pretty(&state.entries)?,
            )
        };
        let file_name = format!("k8s-logs-{}.json", Utc::now().timestamp_millis());
        self.success(
            "Logs exported successfully",
            LogSource::System,
            Metadata::new()
                .with("fileName", file_name.as_str())
                .with("entries", entries),
        );
        Ok(LogExport {
            file_name,
            entries,
            contents,
        })
    }

    /// Resolves after the next `log()` call (or immediately if one happened since
    /// the last wait). Used by the persister to arm its debounce.
    pub async fn save_requested(&self) {
        self.save_requested.notified().await;
    }

    /// Writes the buffer if it changed since the last successful write. Safe to
    /// call from any trigger; concurrent calls are serialised.
    ///
    /// On a quota error the buffer keeps only its newest half and the write is
    /// retried once. Other failures are logged and swallowed.
    pub async fn flush(&self) -> FlushOutcome {
        let mut persisted = self.persisted_revision.lock().await;
        let Some((revision, entries, json)) = self.snapshot_if_dirty(*persisted) else {
            return FlushOutcome::Clean;
        };

        let err = match self.storage.set(&self.options.key, &json).await {
            Ok(()) => {
                *persisted = revision;
                tracing::debug!(operation = "save_logs", entries, "Logs saved");
                return FlushOutcome::Written { entries };
            }
            Err(e) => e,
        };
        if !err.is_quota_exceeded() {
            tracing::warn!(error = %err, operation = "save_logs", "Failed to save logs");
            return FlushOutcome::Failed;
        }

        let kept = {
            let _order = self.notify_order.lock();
            let kept = self.halve();
            self.publish(None);
            kept
        };
        tracing::warn!(
            error = %err,
            operation = "save_logs",
            kept,
            "Storage quota exceeded; dropped oldest half of the logs"
        );
        let Some((revision, entries, json)) = self.snapshot_if_dirty(*persisted) else {
            return FlushOutcome::Clean;
        };
        match self.storage.set(&self.options.key, &json).await {
            Ok(()) => {
                *persisted = revision;
                FlushOutcome::Shrunk { entries }
            }
            Err(e) => {
                tracing::warn!(error = %e, operation = "save_logs", "Retry after shrinking failed");
                FlushOutcome::Failed
            }
        }
    }

    fn snapshot_if_dirty(&self, persisted: u64) -> Option<(u64, usize, String)> {
        let state = self.state.read();
        if state.revision == persisted {
            return None;
        }
        match serde_json::to_string(&state.entries) {
            Ok(json) => Some((state.revision, state.entries.len(), json)),
            Err(e) => {
                tracing::warn!(error = %e, operation = "serialize_logs", "Failed to serialize logs");
                None
            }
        }
    }

    /// Keeps the newest half of the buffer. Returns the new length.
    fn halve(&self) -> usize {
        let mut state = self.state.write();
        let keep = state.entries.len() / 2;
        state.entries.truncate(keep);
        state.revision += 1;
        keep
    }

    fn publish_ordered(&self, new_entry: Option<&LogEntry>) {
        let _order = self.notify_order.lock();
        self.publish(new_entry);
    }

    /// Callers hold `notify_order`.
    fn publish(&self, new_entry: Option<&LogEntry>) {
        if self.subscribers.is_empty() {
            return;
        }
        let view = self.filtered_logs();
        self.subscribers.notify(&view, new_entry);
    }
}

async fn load_entries(storage: &dyn KeyValueStore, options: &LogStoreOptions) -> Vec<LogEntry> {
    let raw = match storage.get(&options.key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!(error = %e, operation = "load_logs", "Failed to read stored logs");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<LogEntry>>(&raw) {
        Ok(mut entries) => {
            entries.truncate(options.max_logs);
            tracing::info!(operation = "load_logs", count = entries.len(), "Loaded logs from storage");
            entries
        }
        Err(e) => {
            tracing::warn!(error = %e, operation = "load_logs", "Stored logs are corrupt; starting empty");
            Vec::new()
        }
    }
}

/// Diagnostic copy of every entry on the process log.
fn mirror_to_console(entry: &LogEntry) {
    match entry.level {
        LogLevel::Error => tracing::error!(
            target: "clusterwatch::console",
            source = %entry.source,
            id = entry.id,
            "{}",
            entry.message
        ),
        LogLevel::Warning => tracing::warn!(
            target: "clusterwatch::console",
            source = %entry.source,
            id = entry.id,
            "{}",
            entry.message
        ),
        LogLevel::Info | LogLevel::Success => tracing::info!(
            target: "clusterwatch::console",
            source = %entry.source,
            level = %entry.level,
            id = entry.id,
            "{}",
            entry.message
        ),
    }
}
