//! Error types for the Signet core library.
//!
//! Every error is local to a single channel; nothing here is fatal to the
//! relay process itself.

use thiserror::Error;

/// Result type alias using the Signet Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for relay operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No live host connection exists for the channel, or the transport
    /// write failed. Recovered by emitting a synthetic error message to the
    /// front-end and resetting connection state; never retried automatically.
    #[error("Native host unavailable for channel {channel_id}")]
    HostUnavailable { channel_id: String },

    /// The accumulated payload of a fragment sequence failed to parse after
    /// the terminal fragment arrived.
    #[error("Malformed fragment sequence for channel {channel_id}, request {request_id}: {source}")]
    MalformedFragmentSequence {
        channel_id: String,
        request_id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Forwarding a message to a front-end port failed.
    #[error("Front-end unavailable for channel {0}")]
    FrontEndUnavailable(String),

    /// A message violated the wire protocol (missing fields, unknown shape).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
