//! Reassembly of fragmented native-host messages.
//!
//! The host delivers very large payloads (big signed documents) as a
//! sequence of fragments keyed by `(channel_id, request_id)`. Fragment order
//! is trusted; the protocol carries no sequence numbers, so out-of-order
//! delivery is an unmodelled transport failure.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use signet_core::wire::request_id_key;
use signet_core::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PendingKey {
    channel_id: String,
    request_id: String,
}

/// Outcome of ingesting one fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum ReassemblyOutcome {
    /// Non-terminal fragment accepted; payload still accumulating.
    Buffered,
    /// Terminal fragment received; the reassembled message parsed and the
    /// pending entry was removed.
    Complete(Value),
}

/// Accumulates multi-fragment payloads into complete logical messages.
///
/// A pending entry exists only between the first and terminal fragment.
/// There is no reassembly timeout: an entry whose terminal fragment never
/// arrives lives until its channel is torn down, at which point
/// [`purge_channel`] removes it.
///
/// [`purge_channel`]: MessageReassembler::purge_channel
#[derive(Default)]
pub struct MessageReassembler {
    pending: RwLock<HashMap<PendingKey, String>>,
}

impl MessageReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one fragment. `partial` is the wire marker: `1` first, `>1`
    /// middle, `-1` terminal.
    ///
    /// On the terminal fragment the accumulated payload is parsed as JSON;
    /// a parse failure removes the pending entry and returns
    /// [`Error::MalformedFragmentSequence`].
    pub async fn ingest(
        &self,
        channel_id: &str,
        request_id: &Value,
        partial: i64,
        body: &str,
    ) -> Result<ReassemblyOutcome> {
        let key = PendingKey {
            channel_id: channel_id.to_string(),
            request_id: request_id_key(request_id),
        };

        let mut pending = self.pending.write().await;
        match partial {
            1 => {
                debug!(channel_id, request_id = %key.request_id, "first fragment");
                pending.insert(key, body.to_string());
                Ok(ReassemblyOutcome::Buffered)
            }
            p if p > 1 => {
                debug!(channel_id, request_id = %key.request_id, part = p, "middle fragment");
                pending.entry(key).or_default().push_str(body);
                Ok(ReassemblyOutcome::Buffered)
            }
            -1 => {
                let mut payload = pending.remove(&key).unwrap_or_default();
                drop(pending);
                payload.push_str(body);
                debug!(
                    channel_id,
                    request_id = %key.request_id,
                    bytes = payload.len(),
                    "terminal fragment, parsing payload"
                );
                match serde_json::from_str(&payload) {
                    Ok(message) => Ok(ReassemblyOutcome::Complete(message)),
                    Err(source) => Err(Error::MalformedFragmentSequence {
                        channel_id: key.channel_id,
                        request_id: key.request_id,
                        source,
                    }),
                }
            }
            other => Err(Error::Protocol(format!(
                "unsupported fragment marker: {other}"
            ))),
        }
    }

    /// Drop all pending entries scoped to a torn-down channel. Returns how
    /// many were removed.
    pub async fn purge_channel(&self, channel_id: &str) -> usize {
        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|key, _| key.channel_id != channel_id);
        before - pending.len()
    }

    /// Number of in-flight reassemblies across all channels.
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn three_fragment_sequence_reassembles() {
        let reassembler = MessageReassembler::new();
        let rid = json!(7);

        assert_eq!(
            reassembler.ingest("tab-1", &rid, 1, "{\"a\":1,").await.unwrap(),
            ReassemblyOutcome::Buffered
        );
        assert_eq!(
            reassembler.ingest("tab-1", &rid, 2, "\"b\":2}").await.unwrap(),
            ReassemblyOutcome::Buffered
        );
        match reassembler.ingest("tab-1", &rid, -1, "").await.unwrap() {
            ReassemblyOutcome::Complete(msg) => assert_eq!(msg, json!({"a": 1, "b": 2})),
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(reassembler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn single_fragment_pair_reassembles() {
        let reassembler = MessageReassembler::new();
        let rid = json!("req-1");

        reassembler.ingest("tab-1", &rid, 1, "{\"ok\":true}").await.unwrap();
        match reassembler.ingest("tab-1", &rid, -1, "").await.unwrap() {
            ReassemblyOutcome::Complete(msg) => assert_eq!(msg["ok"], true),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_request_id_on_different_channels_does_not_cross_contaminate() {
        let reassembler = MessageReassembler::new();
        let rid = json!(1);

        reassembler.ingest("tab-x", &rid, 1, "{\"from\":\"x\"").await.unwrap();
        reassembler.ingest("tab-y", &rid, 1, "{\"from\":\"y\"").await.unwrap();
        reassembler.ingest("tab-x", &rid, 2, "}").await.unwrap();

        match reassembler.ingest("tab-x", &rid, -1, "").await.unwrap() {
            ReassemblyOutcome::Complete(msg) => assert_eq!(msg["from"], "x"),
            other => panic!("expected Complete, got {other:?}"),
        }
        match reassembler.ingest("tab-y", &rid, -1, "}").await.unwrap() {
            ReassemblyOutcome::Complete(msg) => assert_eq!(msg["from"], "y"),
            other => panic!("expected Complete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn string_and_number_request_ids_are_distinct_keys() {
        let reassembler = MessageReassembler::new();

        reassembler.ingest("tab-1", &json!(7), 1, "{\"n\":7}").await.unwrap();
        reassembler.ingest("tab-1", &json!("seven"), 1, "{\"s\":1}").await.unwrap();
        assert_eq!(reassembler.pending_count().await, 2);
    }

    #[tokio::test]
    async fn malformed_terminal_payload_errors_and_clears_entry() {
        let reassembler = MessageReassembler::new();
        let rid = json!(3);

        reassembler.ingest("tab-1", &rid, 1, "not json").await.unwrap();
        let err = reassembler.ingest("tab-1", &rid, -1, " at all").await.unwrap_err();
        assert!(matches!(err, Error::MalformedFragmentSequence { .. }));
        assert_eq!(reassembler.pending_count().await, 0);
    }

    #[tokio::test]
    async fn purge_channel_removes_only_that_channel() {
        let reassembler = MessageReassembler::new();

        reassembler.ingest("tab-x", &json!(1), 1, "{").await.unwrap();
        reassembler.ingest("tab-x", &json!(2), 1, "{").await.unwrap();
        reassembler.ingest("tab-y", &json!(1), 1, "{").await.unwrap();

        assert_eq!(reassembler.purge_channel("tab-x").await, 2);
        assert_eq!(reassembler.pending_count().await, 1);
    }

    #[tokio::test]
    async fn restarted_first_fragment_resets_payload() {
        let reassembler = MessageReassembler::new();
        let rid = json!(9);

        reassembler.ingest("tab-1", &rid, 1, "garbage").await.unwrap();
        reassembler.ingest("tab-1", &rid, 1, "{\"v\":1").await.unwrap();
        match reassembler.ingest("tab-1", &rid, -1, "}").await.unwrap() {
            ReassemblyOutcome::Complete(msg) => assert_eq!(msg["v"], 1),
            other => panic!("expected Complete, got {other:?}"),
        }
    }
}
