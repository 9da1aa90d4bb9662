//! Taskwire client — real-time task-notification delivery.
//!
//! [`NotificationClient`] maintains a persistent WebSocket connection to the
//! backend task-event stream, reconnects on failure with linear backoff,
//! keeps the connection alive with a periodic ping, classifies inbound
//! frames and dispatches them to registered observers, and mirrors the
//! server-side notification store in a local cache synchronized on demand
//! over REST.
//!
//! The client is decoupled from the UI through three trait seams:
//! [`Presenter`] (toasts/alerts), [`Navigator`] (in-app routing) and
//! [`PageLoader`] (full-page navigation). Its lifecycle is tied to the
//! authenticated session: construct on login, [`NotificationClient::connect`]
//! with the user's credentials, [`NotificationClient::disconnect`] on logout.

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod observers;
pub mod present;

pub use client::NotificationClient;
pub use config::ClientConfig;
pub use connection::{ConnectionState, reconnect_delay};
pub use dispatch::LiveNotification;
pub use error::ClientError;
pub use history::HistoryQuery;
pub use observers::{ClientEvent, EventKind, ObserverId, ObserverRegistry};
pub use present::{Navigator, PageLoader, PresentError, Presenter, event_summary};
