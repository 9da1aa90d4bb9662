//! WebSocket frames for the task-event stream.
//!
//! Every frame is a JSON object discriminated by a `type` field.
//!
//! Server → client:
//!   { "type": "connected", "connection_id": "...", "message": "..." }
//!   { "type": "active_tasks", "tasks": [...], "count": 2 }
//!   { "type": "task_status", "task_id": "...", "status": "completed", ... }
//!   { "type": "pong", "timestamp": "..." }
//!   { "type": "error", "message": "..." }
//!
//! Client → server:
//!   { "type": "ping" }
//!   { "type": "subscribe", "task_id": "..." }
//!   { "type": "unsubscribe", "task_id": "..." }

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProtocolError;

// ─────────────────────────────────────────────────────────────────────────────
// Server → Client
// ─────────────────────────────────────────────────────────────────────────────

/// Greeting sent by the server once the stream is established.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedFrame {
    /// Server-assigned connection ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<String>,
    /// Human-readable greeting
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Lifecycle state of a long-running backend task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    Processing,
    Completed,
    Failed,
}

impl TaskState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// A task lifecycle transition pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusEvent {
    /// Unique task identifier (e.g. "interview_123")
    pub task_id: String,
    /// Task type identifier, see [`crate::tasks::task_type_label`]
    #[serde(default)]
    pub task_type: String,
    pub status: TaskState,
    /// Human-readable progress/result message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Free-form result payload, present on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error text, present on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Progress percentage (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    /// Where to take the user when they act on the notification
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
}

/// Summary of an in-flight task, delivered in `active_tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSummary {
    pub task_id: String,
    #[serde(default)]
    pub task_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Classified inbound frame.
#[derive(Debug, Clone)]
pub enum ServerFrame {
    Connected(ConnectedFrame),
    ActiveTasks(Vec<TaskSummary>),
    TaskStatus(TaskStatusEvent),
    Pong,
    /// Server-side complaint (e.g. it did not understand an outbound frame)
    Error { message: Option<String> },
    /// Unrecognized tag, retained so the caller can log it
    Unknown(String),
}

#[derive(Debug, Deserialize)]
struct ActiveTasksFrame {
    #[serde(default)]
    tasks: Vec<TaskSummary>,
}

#[derive(Debug, Deserialize)]
struct ErrorFrame {
    #[serde(default)]
    message: Option<String>,
}

/// Parse one inbound text frame.
///
/// The payload is decoded in two steps: first to a [`Value`] to read the
/// `type` tag, then into the typed shape for that tag. Unknown tags are not
/// an error — they come back as [`ServerFrame::Unknown`] so the caller can
/// log and drop them.
pub fn parse_frame(text: &str) -> Result<ServerFrame, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let tag = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingTag)?
        .to_string();

    match tag.as_str() {
        "connected" => decode(&tag, value).map(ServerFrame::Connected),
        "active_tasks" => {
            decode::<ActiveTasksFrame>(&tag, value).map(|f| ServerFrame::ActiveTasks(f.tasks))
        }
        "task_status" => decode(&tag, value).map(ServerFrame::TaskStatus),
        "pong" => Ok(ServerFrame::Pong),
        "error" => decode::<ErrorFrame>(&tag, value)
            .map(|f| ServerFrame::Error { message: f.message }),
        _ => Ok(ServerFrame::Unknown(tag)),
    }
}

fn decode<T: serde::de::DeserializeOwned>(tag: &str, value: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(value).map_err(|source| ProtocolError::Payload {
        frame: tag.to_string(),
        source,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Client → Server
// ─────────────────────────────────────────────────────────────────────────────

/// Outbound frames. `Ping` is the keep-alive; `Subscribe`/`Unsubscribe`
/// scope the stream to specific tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Ping,
    Subscribe { task_id: String },
    Unsubscribe { task_id: String },
}
