//! Canonical message types for both relay transports.

use serde_json::Value;

use crate::logging::LogLevel;

/// A message received on the front-end transport.
#[derive(Debug, Clone, PartialEq)]
pub enum FrontMessage {
    /// Process-wide verbosity change. Broadcast; never routed to a host.
    SetLogLevel(LogLevel),
    /// Anything else: forwarded verbatim to the channel's native host.
    Request { channel_id: String, raw: Value },
}

/// A message received from the native host, classified in dispatch priority
/// order: fragments first, then fatal error notifications, then approval
/// queries, then passthrough.
#[derive(Debug, Clone, PartialEq)]
pub enum HostMessage {
    /// One piece of a logical message too large to send atomically.
    /// `partial` is the fragment marker: `1` first, `>1` middle, `-1`
    /// terminal.
    Fragment {
        channel_id: String,
        request_id: Value,
        partial: i64,
        body: String,
    },
    /// Host-internal fatal condition. Logged, never forwarded; the channel
    /// stays open.
    Fatal { channel_id: String, error: String },
    /// Host-issued check of whether an origin has prior user consent.
    /// Answered from the local cache, never forwarded to the front-end.
    /// `raw` keeps the full envelope so the answer can be injected into its
    /// parameter list and echoed back.
    ApprovalQuery {
        channel_id: String,
        action: ApprovalAction,
        origin: String,
        raw: Value,
    },
    /// Everything else: forwarded verbatim to the channel's front-end port.
    Passthrough { channel_id: String, raw: Value },
}

impl HostMessage {
    /// Channel this message is scoped to.
    pub fn channel_id(&self) -> &str {
        match self {
            Self::Fragment { channel_id, .. }
            | Self::Fatal { channel_id, .. }
            | Self::ApprovalQuery { channel_id, .. }
            | Self::Passthrough { channel_id, .. } => channel_id,
        }
    }
}

/// What an `approved_site` query asks the relay to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalAction {
    /// Record consent for the origin now, then answer.
    Add,
    /// Answer from the cache only.
    Query,
}
