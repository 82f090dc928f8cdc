// Persistence tests: flush round-trip, corrupt data, quota shrinking, persister triggers

mod common;

use clusterwatch::kv_store::{KeyValueStore, MemoryStore};
use clusterwatch::log_store::{FlushOutcome, LogStore};
use clusterwatch::models::*;
use clusterwatch::persister::{self, PersisterConfig};
use common::{LOG_KEY, memory_log_store, messages, options};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};

/// Entry large enough that its serialized size is dominated by the message.
fn padded(i: usize) -> String {
    format!("{i:02}-{}", "x".repeat(1000))
}

#[tokio::test]
async fn test_flush_then_reopen_restores_buffer() {
    let (store, backend) = memory_log_store(50).await;
    store.info("one", LogSource::Dashboard, Metadata::new());
    store.warning("two", LogSource::K8sMonitor, Metadata::new().with("podName", "web-1"));
    store.error("three", LogSource::System, Metadata::new());

    assert_eq!(store.flush().await, FlushOutcome::Written { entries: 3 });

    let reopened = LogStore::open(backend, options(50)).await;
    assert_eq!(reopened.all_logs(), store.all_logs());
    let next = reopened.info("four", LogSource::Dashboard, Metadata::new());
    assert_eq!(next.id, 3);
}

#[tokio::test]
async fn test_flush_is_idempotent_until_next_change() {
    let (store, _) = memory_log_store(50).await;
    assert_eq!(store.flush().await, FlushOutcome::Clean);
    store.info("one", LogSource::Dashboard, Metadata::new());
    assert_eq!(store.flush().await, FlushOutcome::Written { entries: 1 });
    assert_eq!(store.flush().await, FlushOutcome::Clean);
    store.set_filter(FilterUpdate::Search("one".into()));
    assert_eq!(store.flush().await, FlushOutcome::Clean);
}

#[tokio::test]
async fn test_open_with_corrupt_data_starts_empty() {
    let backend = Arc::new(MemoryStore::new());
    backend.set(LOG_KEY, "{not json").await.unwrap();
    let store = LogStore::open(backend, options(50)).await;
    assert!(store.is_empty());
    let entry = store.info("fresh", LogSource::Dashboard, Metadata::new());
    assert_eq!(entry.id, 0);
}

#[tokio::test]
async fn test_open_truncates_to_capacity() {
    let (big, backend) = memory_log_store(10).await;
    for i in 0..10 {
        big.info(format!("m{i}"), LogSource::Dashboard, Metadata::new());
    }
    big.flush().await;

    let small = LogStore::open(backend, options(4)).await;
    assert_eq!(messages(&small.all_logs()), vec!["m9", "m8", "m7", "m6"]);
}

#[tokio::test]
async fn test_quota_exceeded_keeps_newest_half_and_retries() {
    let backend = Arc::new(MemoryStore::with_quota(8_000));
    let store = LogStore::open(backend.clone(), options(50)).await;
    for i in 0..10 {
        store.info(padded(i), LogSource::Dashboard, Metadata::new());
    }
    let shrunk = Arc::new(AtomicUsize::new(0));
    let flag = shrunk.clone();
    let _sub = store.subscribe(move |logs, new_entry| {
        if new_entry.is_none() {
            flag.store(logs.len(), Ordering::SeqCst);
        }
        Ok(())
    });

    assert_eq!(store.flush().await, FlushOutcome::Shrunk { entries: 5 });
    assert_eq!(store.len(), 5);
    assert_eq!(store.all_logs()[0].message, padded(9));
    assert_eq!(store.all_logs()[4].message, padded(5));
    assert_eq!(shrunk.load(Ordering::SeqCst), 5);

    let stored: Vec<LogEntry> =
        serde_json::from_str(&backend.get(LOG_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(stored.len(), 5);
}

#[tokio::test]
async fn test_quota_still_exceeded_after_shrink_is_swallowed() {
    let backend = Arc::new(MemoryStore::with_quota(500));
    let store = LogStore::open(backend.clone(), options(50)).await;
    for i in 0..10 {
        store.info(padded(i), LogSource::Dashboard, Metadata::new());
    }
    assert_eq!(store.flush().await, FlushOutcome::Failed);
    assert_eq!(store.len(), 5);
    assert!(backend.get(LOG_KEY).await.unwrap().is_none());

    // The store keeps working after a failed save.
    store.info("after", LogSource::Dashboard, Metadata::new());
    assert_eq!(store.len(), 6);
}

fn persister_config(debounce_ms: u64, flush_interval_secs: u64) -> PersisterConfig {
    PersisterConfig {
        debounce_ms,
        flush_interval_secs,
    }
}

#[tokio::test(start_paused = true)]
async fn test_persister_debounces_bursts() {
    let (store, backend) = memory_log_store(50).await;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = persister::spawn(store.clone(), persister_config(1000, 30), shutdown_rx);

    store.info("one", LogSource::Dashboard, Metadata::new());
    sleep(Duration::from_millis(700)).await;
    assert!(backend.get(LOG_KEY).await.unwrap().is_none());

    // A second append re-arms the quiet period.
    store.info("two", LogSource::Dashboard, Metadata::new());
    sleep(Duration::from_millis(700)).await;
    assert!(backend.get(LOG_KEY).await.unwrap().is_none());

    sleep(Duration::from_millis(400)).await;
    let stored: Vec<LogEntry> =
        serde_json::from_str(&backend.get(LOG_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(messages(&stored), vec!["two", "one"]);

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_persister_interval_flush_without_quiet_period() {
    let (store, backend) = memory_log_store(50).await;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = persister::spawn(store.clone(), persister_config(60_000, 5), shutdown_rx);

    store.info("one", LogSource::Dashboard, Metadata::new());
    sleep(Duration::from_millis(5_500)).await;
    assert!(backend.get(LOG_KEY).await.unwrap().is_some());

    let _ = shutdown_tx.send(());
    handle.await.unwrap();
}

#[tokio::test]
async fn test_persister_flushes_on_shutdown() {
    let (store, backend) = memory_log_store(50).await;
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let handle = persister::spawn(store.clone(), persister_config(60_000, 3_600), shutdown_rx);

    store.info("pending", LogSource::Dashboard, Metadata::new());
    let _ = shutdown_tx.send(());
    handle.await.unwrap();

    let stored: Vec<LogEntry> =
        serde_json::from_str(&backend.get(LOG_KEY).await.unwrap().unwrap()).unwrap();
    assert_eq!(messages(&stored), vec!["pending"]);
}
