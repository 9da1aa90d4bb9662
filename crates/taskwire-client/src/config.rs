//! Client configuration.

use std::time::Duration;

/// Notification client configuration.
///
/// The defaults carry the protocol constants: 30 s heartbeat, linear
/// backoff at 5 s per attempt, 5 attempts before giving up.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend REST API (e.g. "http://localhost:8000")
    pub http_base: String,
    /// Base URL of the event stream (e.g. "ws://localhost:8000")
    pub ws_base: String,
    /// Keep-alive ping period while the connection is open
    pub heartbeat_interval: Duration,
    /// Backoff unit: the Nth consecutive retry waits `N × this`
    pub reconnect_base_delay: Duration,
    /// Consecutive failures tolerated before giving up permanently
    pub max_reconnect_attempts: u32,
    /// Bound on the in-memory ring of recently delivered notifications
    pub live_buffer_cap: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            http_base: "http://localhost:8000".into(),
            ws_base: "ws://localhost:8000".into(),
            heartbeat_interval: Duration::from_secs(30),
            reconnect_base_delay: Duration::from_secs(5),
            max_reconnect_attempts: 5,
            live_buffer_cap: 100,
        }
    }
}

impl ClientConfig {
    /// Event-stream URL for one authenticated user.
    pub fn stream_url(&self, user_id: i64, token: &str) -> String {
        format!(
            "{}/api/task/ws/task/{user_id}?token={token}",
            self.ws_base.trim_end_matches('/')
        )
    }

    /// REST URL under the task API namespace.
    pub fn rest_url(&self, path: &str) -> String {
        format!("{}/api/task{path}", self.http_base.trim_end_matches('/'))
    }
}
