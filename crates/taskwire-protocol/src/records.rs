//! Server-owned notification records and REST response envelopes.
//!
//! Records mirror the backend's notification store row-for-row; the local
//! cache in the client is only ever as fresh as the last explicit fetch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Delivery/read state of a stored notification.
///
/// Anything other than `Read` counts as unread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Read,
    Failed,
}

impl NotificationStatus {
    pub fn is_read(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// One stored notification, as returned by the notification REST store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: i64,
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default)]
    pub task_title: String,
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// UI severity hint: success, error, info, warning
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// REST envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Standard response envelope: `{ "code": 200, "message": "...", "data": {...} }`.
///
/// Fetch endpoints signal success with `code == 200`; mutation endpoints
/// signal it at the HTTP level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    pub code: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }
}

/// Payload of `GET /notifications`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryData {
    #[serde(default)]
    pub notifications: Vec<NotificationRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

/// Payload of `GET /notifications/unread-count`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadCountData {
    pub unread_count: u64,
}
