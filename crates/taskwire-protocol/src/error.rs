//! Protocol error types.

use thiserror::Error;

/// Errors produced while decoding wire data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The frame was not valid JSON.
    #[error("invalid JSON frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame had no string `type` discriminator.
    #[error("frame has no `type` field")]
    MissingTag,

    /// The tag was recognized but the payload did not match its shape.
    #[error("malformed `{frame}` frame: {source}")]
    Payload {
        frame: String,
        #[source]
        source: serde_json::Error,
    },
}
