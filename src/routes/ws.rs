// WebSocket log stream: snapshot on connect, then one update per store notification

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use bytes::Bytes;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::log_store::{LogStore, Subscription};
use crate::models::LogEntry;

pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum StreamMessage {
    Snapshot {
        logs: Vec<LogEntry>,
    },
    #[serde(rename_all = "camelCase")]
    Update {
        logs: Vec<LogEntry>,
        new_log: Option<LogEntry>,
    },
}

/// Removes the store subscription when the connection ends, however it ends.
struct SubscriptionGuard(Option<Subscription>);

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        if let Some(subscription) = self.0.take() {
            subscription.unsubscribe();
        }
    }
}

/// Store-side end of a connection's bounded update queue. When the queue is
/// full the update is dropped and the connection is marked as lagged.
struct UpdateSender {
    tx: mpsc::Sender<StreamMessage>,
    lagged: Arc<AtomicBool>,
}

impl UpdateSender {
    fn push(&self, message: StreamMessage) -> anyhow::Result<()> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                if !self.lagged.swap(true, Ordering::AcqRel) {
                    tracing::warn!(
                        capacity = self.tx.max_capacity(),
                        "Log stream client is lagging, dropping updates until it catches up"
                    );
                }
                Ok(())
            }
            Err(TrySendError::Closed(_)) => Err(anyhow::anyhow!("log stream closed")),
        }
    }
}

fn update_queue(capacity: usize) -> (UpdateSender, mpsc::Receiver<StreamMessage>, Arc<AtomicBool>) {
    let (tx, rx) = mpsc::channel(capacity);
    let lagged = Arc::new(AtomicBool::new(false));
    (
        UpdateSender {
            tx,
            lagged: lagged.clone(),
        },
        rx,
        lagged,
    )
}

pub(super) async fn ws_logs(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let store = state.store.clone();
    let ping_every = Duration::from_secs(state.config.publishing.ws_ping_interval_secs);
    let queue_capacity = state.config.publishing.ws_queue_capacity;
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_logs(socket, store, ping_every, queue_capacity).await {
            tracing::info!("Log stream error: {}", e);
        }
    })
}

async fn send_json(socket: &mut WebSocket, message: &StreamMessage) -> anyhow::Result<bool> {
    let json = serde_json::to_string(message)?;
    let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Text(json.into()))).await;
    Ok(matches!(r, Ok(Ok(()))))
}

async fn stream_logs(
    mut socket: WebSocket,
    store: Arc<LogStore>,
    ping_every: Duration,
    queue_capacity: usize,
) -> anyhow::Result<()> {
    let (sender, mut rx, lagged) = update_queue(queue_capacity);
    // Subscribe before taking the snapshot so no append falls between the two.
    let _guard = SubscriptionGuard(Some(store.subscribe(move |logs, new_log| {
        sender.push(StreamMessage::Update {
            logs: logs.to_vec(),
            new_log: new_log.cloned(),
        })
    })));
    tracing::info!(subscribers = store.subscriber_count(), "Client connected to log stream");

    let snapshot = StreamMessage::Snapshot {
        logs: store.filtered_logs(),
    };
    if !send_json(&mut socket, &snapshot).await? {
        return Ok(());
    }

    let mut ping_interval = tokio::time::interval(ping_every);
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    // First tick is immediate.
    ping_interval.tick().await;
    loop {
        tokio::select! {
            update = rx.recv() => {
                let Some(update) = update else { break };
                if !send_json(&mut socket, &update).await? {
                    break;
                }
                // Backlog drained after an overflow: resync with the current view.
                if rx.is_empty() && lagged.swap(false, Ordering::AcqRel) {
                    let resync = StreamMessage::Snapshot {
                        logs: store.filtered_logs(),
                    };
                    if !send_json(&mut socket, &resync).await? {
                        break;
                    }
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, socket.send(Message::Ping(Bytes::new()))).await;
                if !matches!(r, Ok(Ok(()))) {
                    break;
                }
            }
        }
    }
    tracing::info!("Client disconnected from log stream");
    Ok(())
}
