//! Connection lifecycle: the task that owns the socket, the heartbeat, and
//! the reconnect backoff.
//!
//! One task per `connect()` call. It cycles
//! `Connecting → Open → Disconnected → RetryPending → Connecting → …` until
//! either the shutdown signal arrives or the consecutive-failure budget is
//! spent (`Exhausted`). Reconnection is driven exclusively from the close
//! path; transport errors only emit an `error` event and let the close
//! follow.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, error, info, trace, warn};

use taskwire_protocol::ClientFrame;

use crate::client::Shared;
use crate::observers::ClientEvent;

/// Lifecycle state of the event-stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Open,
    /// Closed, reconnect scheduled
    RetryPending,
    /// Gave up after the maximum consecutive failures
    Exhausted,
}

/// Delay before the Nth consecutive reconnect attempt (1-based): `N × base`.
pub fn reconnect_delay(attempt: u32, base: Duration) -> Duration {
    base * attempt
}

enum CloseReason {
    Shutdown,
    Transport,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub(crate) async fn run_connection(
    shared: Arc<Shared>,
    user_id: i64,
    token: String,
    mut shutdown: mpsc::Receiver<()>,
) {
    let url = shared.config.stream_url(user_id, &token);

    loop {
        *shared.state.lock() = ConnectionState::Connecting;
        debug!(user_id, "connecting to task event stream");

        let result = tokio::select! {
            result = connect_async(&url) => result,
            _ = shutdown.recv() => {
                *shared.state.lock() = ConnectionState::Disconnected;
                return;
            }
        };

        match result {
            Ok((ws, _response)) => {
                shared.attempts.store(0, Ordering::Relaxed);
                *shared.state.lock() = ConnectionState::Open;
                info!(user_id, "task event stream connected");
                shared.observers.emit(&ClientEvent::Connected(None));

                let reason = drive_open(&shared, ws, &mut shutdown).await;

                shared.outbound.lock().take();
                *shared.state.lock() = ConnectionState::Disconnected;
                shared.observers.emit(&ClientEvent::Disconnected);

                if matches!(reason, CloseReason::Shutdown) {
                    return;
                }
                info!(user_id, "task event stream closed");
            }
            Err(e) => {
                warn!(user_id, "event stream connect failed: {e}");
                shared.observers.emit(&ClientEvent::Error(e.to_string()));
            }
        }

        // Reconnection procedure: bounded linear backoff. A shutdown during
        // the wait cancels the pending attempt.
        let attempt = shared.attempts.load(Ordering::Relaxed);
        if attempt >= shared.config.max_reconnect_attempts {
            error!(
                user_id,
                "giving up on task event stream after {attempt} consecutive failures"
            );
            *shared.state.lock() = ConnectionState::Exhausted;
            return;
        }
        let attempt = attempt + 1;
        shared.attempts.store(attempt, Ordering::Relaxed);

        let delay = reconnect_delay(attempt, shared.config.reconnect_base_delay);
        info!(
            user_id,
            "reconnecting in {delay:?} (attempt {attempt}/{})",
            shared.config.max_reconnect_attempts
        );
        *shared.state.lock() = ConnectionState::RetryPending;

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.recv() => {
                *shared.state.lock() = ConnectionState::Disconnected;
                return;
            }
        }
    }
}

/// Drive an open connection until it closes: heartbeat ticks, outbound
/// frames, inbound frames, shutdown.
async fn drive_open(
    shared: &Arc<Shared>,
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    shutdown: &mut mpsc::Receiver<()>,
) -> CloseReason {
    let (mut sink, mut stream) = ws.split();

    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel();
    *shared.outbound.lock() = Some(outbound_tx);

    let period = shared.config.heartbeat_interval;
    let mut heartbeat = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                let _ = sink.send(Message::Close(None)).await;
                return CloseReason::Shutdown;
            }

            _ = heartbeat.tick() => {
                trace!("sending heartbeat ping");
                if !send_frame(&mut sink, &ClientFrame::Ping).await {
                    return CloseReason::Transport;
                }
            }

            Some(frame) = outbound_rx.recv() => {
                if !send_frame(&mut sink, &frame).await {
                    return CloseReason::Transport;
                }
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => shared.handle_frame(&text),
                Some(Ok(Message::Ping(data))) => {
                    let _ = sink.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("server closed the event stream");
                    return CloseReason::Transport;
                }
                Some(Err(e)) => {
                    warn!("event stream transport error: {e}");
                    shared.observers.emit(&ClientEvent::Error(e.to_string()));
                    return CloseReason::Transport;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

/// Serialize and send one outbound frame. Returns false when the transport
/// is gone.
async fn send_frame(sink: &mut WsSink, frame: &ClientFrame) -> bool {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!("failed to serialize outbound frame: {e}");
            return true;
        }
    };
    if let Err(e) = sink.send(Message::Text(json.into())).await {
        warn!("outbound send failed: {e}");
        return false;
    }
    true
}
