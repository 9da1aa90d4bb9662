//! Taskwire protocol types.
//!
//! Wire-level types for the task-event notification stream and the
//! notification REST store. This crate is the single source of truth for
//! frame shapes, record shapes, envelope formats, and task-type labels.

pub mod error;
pub mod frames;
pub mod records;
pub mod tasks;

pub use error::ProtocolError;
pub use frames::{
    ClientFrame, ConnectedFrame, ServerFrame, TaskState, TaskStatusEvent, TaskSummary,
    parse_frame,
};
pub use records::{
    ApiEnvelope, HistoryData, NotificationRecord, NotificationStatus, UnreadCountData,
};
pub use tasks::task_type_label;
