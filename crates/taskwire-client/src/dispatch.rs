//! Inbound frame classification and dispatch.

use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::{DateTime, Utc};
use tracing::{trace, warn};
use uuid::Uuid;

use taskwire_protocol::{ServerFrame, TaskState, TaskStatusEvent, parse_frame, task_type_label};

use crate::client::Shared;
use crate::observers::ClientEvent;

/// A task-status event captured into the in-memory ring.
#[derive(Debug, Clone)]
pub struct LiveNotification {
    /// Locally generated id (the stream itself carries none)
    pub id: Uuid,
    pub received_at: DateTime<Utc>,
    pub event: TaskStatusEvent,
}

impl Shared {
    /// Classify and dispatch one inbound text frame. Malformed frames are
    /// logged and dropped: no observer notification, no panic.
    pub(crate) fn handle_frame(&self, text: &str) {
        let frame = match parse_frame(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("dropping malformed frame: {e}");
                return;
            }
        };

        match frame {
            ServerFrame::Connected(greeting) => {
                self.observers.emit(&ClientEvent::Connected(Some(greeting)));
            }
            ServerFrame::ActiveTasks(tasks) => {
                trace!("{} active task(s) on connect", tasks.len());
                self.observers.emit(&ClientEvent::ActiveTasks(tasks));
            }
            ServerFrame::TaskStatus(event) => self.handle_task_status(event),
            ServerFrame::Pong => trace!("heartbeat pong"),
            ServerFrame::Error { message } => {
                let message = message.unwrap_or_else(|| "unspecified server error".into());
                warn!("server error frame: {message}");
                self.observers.emit(&ClientEvent::Error(message));
            }
            ServerFrame::Unknown(tag) => warn!("ignoring unknown frame type: {tag}"),
        }
    }

    /// Capture into the live ring, fire the presentation side effect, then
    /// notify observers. The side effect and the emission fail
    /// independently: neither can suppress the other.
    fn handle_task_status(&self, event: TaskStatusEvent) {
        {
            let mut live = self.live.lock();
            live.push_front(LiveNotification {
                id: Uuid::new_v4(),
                received_at: Utc::now(),
                event: event.clone(),
            });
            live.truncate(self.config.live_buffer_cap);
        }

        self.present(&event);
        self.observers.emit(&ClientEvent::TaskStatus(event));
    }

    fn present(&self, event: &TaskStatusEvent) {
        let outcome = catch_unwind(AssertUnwindSafe(|| match event.status {
            TaskState::Completed => self.presenter.task_completed(event),
            TaskState::Failed => self.presenter.task_failed(event),
            TaskState::Processing => {
                let label = task_type_label(&event.task_type);
                let message = event.message.as_deref().unwrap_or("Task in progress...");
                self.presenter.task_processing(label, message)
            }
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(task_id = %event.task_id, "presenter error: {e}"),
            Err(_) => warn!(task_id = %event.task_id, "presenter panicked"),
        }
    }
}
