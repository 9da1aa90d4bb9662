//! Typed observer registry.
//!
//! A mapping from event kind to an ordered list of callbacks. Callbacks for
//! one kind run in registration order; registering the same closure twice
//! yields two invocations; removal is by the identity handle returned from
//! [`ObserverRegistry::on`]. A panicking callback is isolated so it cannot
//! suppress delivery to the callbacks after it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use taskwire_protocol::{ConnectedFrame, NotificationRecord, TaskStatusEvent, TaskSummary};

/// Observable event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connected,
    Disconnected,
    Error,
    ActiveTasks,
    TaskStatus,
    HistoryLoaded,
    NotificationsUpdated,
    UnreadCount,
}

/// An event delivered to observers.
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Stream opened; payload present when the server's greeting frame
    /// arrives, absent for the transport-level open itself.
    Connected(Option<ConnectedFrame>),
    Disconnected,
    /// Informational: transport or REST failure, or a server error frame.
    Error(String),
    ActiveTasks(Vec<TaskSummary>),
    TaskStatus(TaskStatusEvent),
    HistoryLoaded(Vec<NotificationRecord>),
    NotificationsUpdated(Vec<NotificationRecord>),
    UnreadCount(u64),
}

impl ClientEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Connected(_) => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::Error(_) => EventKind::Error,
            Self::ActiveTasks(_) => EventKind::ActiveTasks,
            Self::TaskStatus(_) => EventKind::TaskStatus,
            Self::HistoryLoaded(_) => EventKind::HistoryLoaded,
            Self::NotificationsUpdated(_) => EventKind::NotificationsUpdated,
            Self::UnreadCount(_) => EventKind::UnreadCount,
        }
    }
}

/// Identity handle for a registered observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObserverId(u64);

type Callback = Arc<dyn Fn(&ClientEvent) + Send + Sync>;

/// Ordered observer registry.
#[derive(Default)]
pub struct ObserverRegistry {
    entries: Mutex<Vec<(EventKind, ObserverId, Callback)>>,
    next_id: AtomicU64,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for one event kind, returning its removal handle.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push((kind, id, Arc::new(callback)));
        id
    }

    /// Remove one registration. Unknown handles are a no-op.
    pub fn off(&self, kind: EventKind, id: ObserverId) {
        self.entries
            .lock()
            .retain(|(k, i, _)| !(*k == kind && *i == id));
    }

    /// Deliver an event to every observer registered for its kind,
    /// in registration order.
    pub fn emit(&self, event: &ClientEvent) {
        let kind = event.kind();
        let callbacks: Vec<Callback> = self
            .entries
            .lock()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, _, cb)| cb.clone())
            .collect();

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(?kind, "observer callback panicked");
            }
        }
    }
}
