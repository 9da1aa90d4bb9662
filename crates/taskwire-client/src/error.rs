//! Client error types.

use thiserror::Error;

/// Failures from the notification REST store.
///
/// These never cross the public API boundary: history/mutation calls log
/// them and surface an [`crate::ClientEvent::Error`] instead, leaving the
/// local cache at its last-known-good state.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The HTTP exchange succeeded but the envelope signaled failure.
    #[error("server rejected request: code {code} ({message})")]
    Api { code: i64, message: String },
}
