// Subscriber registry for log store notifications

use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use crate::models::LogEntry;

/// Called with the current filtered view and, for appends, the new entry.
/// `None` means the view changed for another reason (filter change, clear).
pub type LogCallback = dyn Fn(&[LogEntry], Option<&LogEntry>) -> anyhow::Result<()> + Send + Sync;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: Vec<(u64, Arc<LogCallback>)>,
}

#[derive(Clone, Default)]
pub(super) struct Subscribers {
    registry: Arc<Mutex<Registry>>,
}

impl Subscribers {
    pub(super) fn add(&self, callback: Arc<LogCallback>) -> Subscription {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.push((id, callback));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub(super) fn len(&self) -> usize {
        self.registry.lock().callbacks.len()
    }

    pub(super) fn is_empty(&self) -> bool {
        self.registry.lock().callbacks.is_empty()
    }

    /// Runs every callback. A failing or panicking callback is reported and skipped;
    /// the rest still run. The registry lock is not held while callbacks execute.
    pub(super) fn notify(&self, logs: &[LogEntry], new_entry: Option<&LogEntry>) {
        let callbacks: Vec<(u64, Arc<LogCallback>)> = self.registry.lock().callbacks.clone();
        for (id, callback) in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(logs, new_entry))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscriber = id, error = %e, "log subscriber failed");
                }
                Err(_) => {
                    tracing::error!(subscriber = id, "log subscriber panicked");
                }
            }
        }
    }
}

/// Handle returned by [`LogStore::subscribe`](super::LogStore::subscribe).
/// Dropping it leaves the callback registered; call [`unsubscribe`](Self::unsubscribe).
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Removes exactly this subscription's callback. Returns false if the
    /// store is gone.
    pub fn unsubscribe(self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(id, _)| *id != self.id);
        registry.callbacks.len() != before
    }
}
