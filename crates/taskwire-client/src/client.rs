//! The notification client — public API surface and shared state.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::AtomicU32;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use taskwire_protocol::{ClientFrame, NotificationRecord, TaskStatusEvent};

use crate::config::ClientConfig;
use crate::connection::{ConnectionState, run_connection};
use crate::dispatch::LiveNotification;
use crate::history::{HistoryCache, HistoryQuery};
use crate::observers::{ClientEvent, EventKind, ObserverId, ObserverRegistry};
use crate::present::{Navigator, PageLoader, Presenter};

/// State shared between the public API and the connection task.
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) observers: ObserverRegistry,
    pub(crate) state: Mutex<ConnectionState>,
    /// Consecutive failed (re)connection attempts
    pub(crate) attempts: AtomicU32,
    /// Ring of recently delivered task-status events, newest first
    pub(crate) live: Mutex<VecDeque<LiveNotification>>,
    /// Local mirror of the server-side notification store
    pub(crate) cache: Mutex<HistoryCache>,
    pub(crate) presenter: Arc<dyn Presenter>,
    pub(crate) page_loader: Arc<dyn PageLoader>,
    pub(crate) navigator: Mutex<Option<Arc<dyn Navigator>>>,
    /// Outbound frame queue; present only while the connection is open
    pub(crate) outbound: Mutex<Option<mpsc::UnboundedSender<ClientFrame>>>,
    pub(crate) http: reqwest::Client,
}

struct ConnectionHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

/// Real-time task-notification delivery client.
///
/// One instance per authenticated session. The rest of the application
/// subscribes through [`NotificationClient::on`] and reads the cached
/// history/unread state through the accessors; only this client mutates
/// that state.
pub struct NotificationClient {
    shared: Arc<Shared>,
    conn: Mutex<Option<ConnectionHandle>>,
}

impl NotificationClient {
    pub fn new(
        config: ClientConfig,
        presenter: Arc<dyn Presenter>,
        page_loader: Arc<dyn PageLoader>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                observers: ObserverRegistry::new(),
                state: Mutex::new(ConnectionState::Disconnected),
                attempts: AtomicU32::new(0),
                live: Mutex::new(VecDeque::new()),
                cache: Mutex::new(HistoryCache::default()),
                presenter,
                page_loader,
                navigator: Mutex::new(None),
                outbound: Mutex::new(None),
                http: reqwest::Client::new(),
            }),
            conn: Mutex::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Connection lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Open the event stream for `user_id`. No-op when already open; a
    /// stale connection task (mid-retry, or exhausted) is replaced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, user_id: i64, token: &str) {
        if *self.shared.state.lock() == ConnectionState::Open {
            debug!("event stream already connected");
            return;
        }

        let mut conn = self.conn.lock();
        if let Some(old) = conn.take() {
            old.task.abort();
        }

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(run_connection(
            self.shared.clone(),
            user_id,
            token.to_string(),
            shutdown_rx,
        ));
        *conn = Some(ConnectionHandle { shutdown_tx, task });
    }

    /// Close the stream and stop the connection task, including any pending
    /// scheduled reconnect. Resets the failure counter so a later
    /// [`connect`](Self::connect) starts a fresh backoff sequence.
    pub async fn disconnect(&self) {
        let handle = self.conn.lock().take();
        if let Some(handle) = handle {
            // The task exits on the shutdown signal; if it already finished
            // (retries exhausted) the send fails and the await is immediate.
            let _ = handle.shutdown_tx.send(()).await;
            let _ = handle.task.await;
        }
        self.shared
            .attempts
            .store(0, std::sync::atomic::Ordering::Relaxed);
        *self.shared.state.lock() = ConnectionState::Disconnected;
        self.shared.outbound.lock().take();
        debug!("event stream disconnected");
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Observers
    // ─────────────────────────────────────────────────────────────────────

    /// Register an observer. Observers for one kind run in registration
    /// order; registering the same closure twice invokes it twice.
    pub fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&ClientEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.shared.observers.on(kind, callback)
    }

    pub fn off(&self, kind: EventKind, id: ObserverId) {
        self.shared.observers.off(kind, id);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Navigation
    // ─────────────────────────────────────────────────────────────────────

    /// Install the in-app navigation mechanism. Set once, before the first
    /// redirect is expected; optional.
    pub fn set_navigator(&self, navigator: Arc<dyn Navigator>) {
        *self.shared.navigator.lock() = Some(navigator);
    }

    /// Act on a delivered event's redirect target (the UI layer calls this
    /// when the user clicks a completed-task notification).
    ///
    /// Absolute `http(s)` URLs always get full-page navigation, even with a
    /// navigator installed. Anything else is an internal path: routed
    /// through the navigator when present, full-page otherwise.
    pub fn follow_redirect(&self, event: &TaskStatusEvent) {
        let Some(url) = event.redirect_url.as_deref() else {
            return;
        };

        if url.starts_with("http://") || url.starts_with("https://") {
            if let Err(e) = self.shared.page_loader.load(url) {
                warn!("full-page navigation to {url} failed: {e}");
            }
            return;
        }

        let navigator = self.shared.navigator.lock().clone();
        match navigator {
            Some(navigator) => {
                if let Err(e) = navigator.push(url) {
                    warn!("navigation to {url} failed: {e}");
                }
            }
            None => {
                debug!("no navigator installed, falling back to full-page navigation");
                if let Err(e) = self.shared.page_loader.load(url) {
                    warn!("full-page navigation to {url} failed: {e}");
                }
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Task subscriptions
    // ─────────────────────────────────────────────────────────────────────

    /// Ask the server to push updates for one task. Silently dropped when
    /// the stream is not open (same rule as the heartbeat).
    pub fn subscribe_task(&self, task_id: &str) {
        self.send_frame(ClientFrame::Subscribe {
            task_id: task_id.to_string(),
        });
    }

    pub fn unsubscribe_task(&self, task_id: &str) {
        self.send_frame(ClientFrame::Unsubscribe {
            task_id: task_id.to_string(),
        });
    }

    fn send_frame(&self, frame: ClientFrame) {
        let outbound = self.shared.outbound.lock();
        match outbound.as_ref() {
            Some(tx) => {
                if tx.send(frame).is_err() {
                    debug!("connection task gone, dropping outbound frame");
                }
            }
            None => debug!("event stream not open, dropping outbound frame"),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Notification history (REST-synchronized cache)
    // ─────────────────────────────────────────────────────────────────────

    /// Replace the cached history with one page from the server. Failures
    /// are logged and emitted as `error`; the cache is left untouched.
    pub async fn fetch_history(&self, token: &str, query: HistoryQuery) {
        self.shared.fetch_history(token, query).await;
    }

    /// Mark one notification read; the cache is only mutated once the
    /// server confirms.
    pub async fn mark_read(&self, id: i64, token: &str) {
        self.shared.mark_read(id, token).await;
    }

    pub async fn mark_all_read(&self, token: &str) {
        self.shared.mark_all_read(token).await;
    }

    /// Delete one notification. The unread counter is deliberately left
    /// alone here, matching the server-side accounting.
    pub async fn delete_notification(&self, id: i64, token: &str) {
        self.shared.delete_notification(id, token).await;
    }

    /// Fetch the authoritative unread count, overwriting the local counter.
    /// Returns 0 on any failure.
    pub async fn fetch_unread_count(&self, token: &str) -> u64 {
        self.shared.fetch_unread_count(token).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────

    /// Recently delivered task-status events, newest first.
    pub fn live_notifications(&self) -> Vec<LiveNotification> {
        self.shared.live.lock().iter().cloned().collect()
    }

    /// Cached history page from the last successful fetch.
    pub fn history(&self) -> Vec<NotificationRecord> {
        self.shared.cache.lock().records.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.shared.cache.lock().unread
    }
}
