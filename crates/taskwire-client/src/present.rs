//! Trait seams toward the UI layer.
//!
//! The client never talks to a toast surface or a router directly; it is
//! handed implementations of these traits. Failures here are logged and
//! never interfere with observer delivery.

use thiserror::Error;

use taskwire_protocol::TaskStatusEvent;

/// A presentation-layer failure. Carries only a message — the client has no
/// use for the collaborator's internal error types.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PresentError(pub String);

impl PresentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Toast/alert surface for task lifecycle transitions.
///
/// `task_completed` notifications are expected to be clickable; the UI layer
/// calls [`crate::NotificationClient::follow_redirect`] with the event when
/// the user clicks one.
pub trait Presenter: Send + Sync {
    /// Persistent success notification.
    fn task_completed(&self, event: &TaskStatusEvent) -> Result<(), PresentError>;
    /// Persistent error notification.
    fn task_failed(&self, event: &TaskStatusEvent) -> Result<(), PresentError>;
    /// Transient informational toast. `label` is the display name of the
    /// task type, see [`taskwire_protocol::task_type_label`].
    fn task_processing(&self, label: &str, message: &str) -> Result<(), PresentError>;
}

/// In-app route navigation. Optional — when absent, redirects degrade to
/// [`PageLoader`].
pub trait Navigator: Send + Sync {
    fn push(&self, path: &str) -> Result<(), PresentError>;
}

/// Full-page navigation (leaves the app; no client state survives).
pub trait PageLoader: Send + Sync {
    fn load(&self, url: &str) -> Result<(), PresentError>;
}

/// Render a task-status event as a plain-text summary: message first, then
/// result fields, then the error line.
pub fn event_summary(event: &TaskStatusEvent) -> String {
    let mut lines = Vec::new();
    if let Some(message) = &event.message {
        lines.push(message.clone());
    }
    if let Some(result) = event.result.as_ref().and_then(|v| v.as_object()) {
        for (key, value) in result {
            lines.push(format!("{key}: {value}"));
        }
    }
    if let Some(error) = &event.error {
        lines.push(format!("error: {error}"));
    }
    lines.join("\n")
}
