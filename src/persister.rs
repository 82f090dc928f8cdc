// Background persistence for the log store.
// Two triggers share LogStore::flush: a debounce re-armed by every append, and a hard interval.

use std::sync::Arc;
use tokio::time::{Duration, Instant, interval, sleep_until};

use crate::config::StorageConfig;
use crate::log_store::{FlushOutcome, LogStore};

/// Persister timing.
#[derive(Debug, Clone)]
pub struct PersisterConfig {
    /// Quiet period after the last append before writing.
    pub debounce_ms: u64,
    /// Hard flush interval, regardless of debounce state.
    pub flush_interval_secs: u64,
}

impl From<&StorageConfig> for PersisterConfig {
    fn from(config: &StorageConfig) -> Self {
        Self {
            debounce_ms: config.debounce_ms,
            flush_interval_secs: config.flush_interval_secs,
        }
    }
}

/// Spawns the task that writes the store to its backend.
/// On shutdown it performs a final flush and exits.
pub fn spawn(
    store: Arc<LogStore>,
    config: PersisterConfig,
    mut shutdown_rx: tokio::sync::oneshot::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    let debounce = Duration::from_millis(config.debounce_ms);
    let flush_interval = Duration::from_secs(config.flush_interval_secs);
    tokio::spawn(async move {
        let mut flush_tick = interval(flush_interval);
        flush_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // First tick fires immediately; nothing to write yet.
        flush_tick.tick().await;

        let mut deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = store.save_requested() => {
                    deadline = Some(Instant::now() + debounce);
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    deadline = None;
                    report(store.flush().await, "debounce");
                }
                _ = flush_tick.tick() => {
                    report(store.flush().await, "interval");
                }
            }
        }
        report(store.flush().await, "shutdown");
        tracing::debug!("Log persister shutting down");
    })
}

fn report(outcome: FlushOutcome, trigger: &'static str) {
    match outcome {
        FlushOutcome::Clean => {}
        FlushOutcome::Written { entries } => {
            tracing::debug!(operation = "flush_logs", trigger, entries, "Logs persisted");
        }
        FlushOutcome::Shrunk { entries } => {
            tracing::info!(
                operation = "flush_logs",
                trigger,
                entries,
                "Logs persisted after shrinking for quota"
            );
        }
        FlushOutcome::Failed => {
            tracing::debug!(operation = "flush_logs", trigger, "Log flush failed");
        }
    }
}
