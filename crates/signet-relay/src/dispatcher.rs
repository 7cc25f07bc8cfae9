//! The relay control loop.
//!
//! Routes front-end messages to the matching host connection, classifies
//! host messages (fragments, fatal errors, approval queries, passthrough)
//! and enforces the bidirectional disconnect protocol: tearing down one leg
//! of a channel always tears down the other, and never touches any other
//! channel.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};

use signet_core::wire::{self, ApprovalAction, HostMessage};
use signet_core::{Error, LogLevel, LogLevelHandle, Result};

use crate::approval::ApprovedSiteCache;
use crate::host::{HostConnector, HostEvent};
use crate::reassembly::{MessageReassembler, ReassemblyOutcome};
use crate::registry::ChannelRegistry;
use crate::status::{PluginStatus, StatusBroadcaster, StatusEvent};

/// Dispatcher options.
#[derive(Debug, Clone)]
pub struct RelayOptions {
    /// Acknowledge non-terminal fragments with `get_part` control messages
    /// (transport variant B). Off for transports with native backpressure.
    pub fragment_ack: bool,
    /// Approval cache time-to-live.
    pub approval_ttl: Duration,
}

impl Default for RelayOptions {
    fn default() -> Self {
        Self {
            fragment_ack: false,
            approval_ttl: crate::approval::DEFAULT_APPROVAL_TTL,
        }
    }
}

/// The relay dispatcher. Cheap to clone; all state is shared.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<ChannelRegistry>,
    connector: Arc<HostConnector>,
    reassembler: Arc<MessageReassembler>,
    approvals: Arc<ApprovedSiteCache>,
    status: StatusBroadcaster,
    log_handle: Option<LogLevelHandle>,
    fragment_ack: bool,
}

impl Relay {
    pub fn new(
        registry: Arc<ChannelRegistry>,
        connector: Arc<HostConnector>,
        options: RelayOptions,
        log_handle: Option<LogLevelHandle>,
    ) -> Self {
        Self {
            registry,
            connector,
            reassembler: Arc::new(MessageReassembler::new()),
            approvals: Arc::new(ApprovedSiteCache::new(options.approval_ttl)),
            status: StatusBroadcaster::default(),
            log_handle,
            fragment_ack: options.fragment_ack,
        }
    }

    /// Subscribe to channel status events (plugin load ok / load error).
    pub fn status_events(&self) -> broadcast::Receiver<StatusEvent> {
        self.status.subscribe()
    }

    /// Number of in-flight reassemblies, for observability.
    pub async fn pending_reassemblies(&self) -> usize {
        self.reassembler.pending_count().await
    }

    /// Establish a channel: register the front-end port, connect the host
    /// leg if it is not already up, and start pumping host events.
    ///
    /// On host connect failure the registration is rolled back and a
    /// `LoadError` status is published.
    pub async fn open_channel(&self, channel_id: &str, front_end: mpsc::Sender<Value>) -> Result<()> {
        self.registry.register(channel_id, front_end).await;

        if !self.connector.is_connected(channel_id).await {
            let events = match self.connector.connect(channel_id).await {
                Ok(events) => events,
                Err(e) => {
                    error!(channel_id, error = %e, "native host connect failed");
                    self.registry.unregister(channel_id).await;
                    self.status.publish(channel_id, PluginStatus::LoadError);
                    return Err(e);
                }
            };
            let relay = self.clone();
            let channel = channel_id.to_string();
            tokio::spawn(async move {
                relay.pump_host_events(&channel, events).await;
            });
        }

        self.status.publish(channel_id, PluginStatus::LoadOk);
        info!(channel_id, "channel established");
        Ok(())
    }

    /// Drain one host connection's events into the dispatcher.
    pub async fn pump_host_events(&self, channel_id: &str, mut events: mpsc::Receiver<HostEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                HostEvent::Frame(frame) => self.on_host_frame(channel_id, frame).await,
                HostEvent::Disconnected => {
                    self.handle_host_disconnect(channel_id).await;
                    return;
                }
            }
        }
    }

    /// Forward a front-end message to the channel's host connection.
    /// A failed send has already delivered its synthetic error message.
    pub async fn send_to_host(&self, channel_id: &str, message: Value) -> Result<()> {
        self.connector.send(channel_id, message).await
    }

    /// Change the process-wide log level. Broadcast semantics: no ack.
    pub fn set_log_level(&self, level: LogLevel) {
        info!(%level, "log level changed");
        if let Some(handle) = &self.log_handle {
            handle.set_level(level);
        }
    }

    /// Classify and dispatch one raw frame from a host connection.
    pub async fn on_host_frame(&self, channel_hint: &str, frame: Value) {
        match wire::parse_host_frame(frame) {
            Ok(message) => self.dispatch_host_message(message).await,
            Err(e) => {
                warn!(channel_id = channel_hint, error = %e, "dropping unparseable host message");
            }
        }
    }

    async fn dispatch_host_message(&self, message: HostMessage) {
        match message {
            HostMessage::Fragment {
                channel_id,
                request_id,
                partial,
                body,
            } => {
                self.on_fragment(&channel_id, &request_id, partial, &body)
                    .await;
            }
            HostMessage::Fatal { channel_id, error } => {
                // Connection-level condition; the channel stays open.
                error!(channel_id, error = %error, "fatal error reported by native host");
            }
            HostMessage::ApprovalQuery {
                channel_id,
                action,
                origin,
                raw,
            } => self.on_approval_query(&channel_id, action, &origin, raw).await,
            HostMessage::Passthrough { channel_id, raw } => {
                self.deliver_to_front(&channel_id, raw).await;
            }
        }
    }

    async fn on_fragment(&self, channel_id: &str, request_id: &Value, partial: i64, body: &str) {
        match self
            .reassembler
            .ingest(channel_id, request_id, partial, body)
            .await
        {
            Ok(ReassemblyOutcome::Buffered) => {
                if self.fragment_ack {
                    let ack = wire::get_part_ack(channel_id, request_id, partial);
                    let _ = self.connector.send(channel_id, ack).await;
                }
            }
            Ok(ReassemblyOutcome::Complete(payload)) => {
                self.deliver_to_front(channel_id, payload).await;
            }
            Err(e @ Error::MalformedFragmentSequence { .. }) => {
                error!(channel_id, error = %e, "reassembled payload failed to parse");
                self.deliver_to_front(channel_id, wire::reassembly_error(channel_id, request_id))
                    .await;
            }
            Err(e) => warn!(channel_id, error = %e, "fragment rejected"),
        }
    }

    async fn on_approval_query(
        &self,
        channel_id: &str,
        action: ApprovalAction,
        origin: &str,
        mut raw: Value,
    ) {
        if action == ApprovalAction::Add {
            self.approvals.record_approval(origin).await;
        }
        let approved = self.approvals.is_approved(origin).await;
        debug!(channel_id, origin, approved, "answering approval query");
        wire::inject_approval_answer(&mut raw, approved);
        // Answered back to the host; never forwarded to the front-end.
        let _ = self.connector.send(channel_id, raw).await;
    }

    /// Deliver a message to the channel's front-end port. A failed delivery
    /// clears that leg's registry entry; the host leg stays up until its
    /// next use.
    async fn deliver_to_front(&self, channel_id: &str, message: Value) {
        let Some(port) = self.registry.lookup(channel_id).await else {
            warn!(channel_id, "no front-end port for channel, dropping message");
            return;
        };
        if port.send(message).await.is_err() {
            warn!(channel_id, "front-end port closed, clearing registry entry");
            self.registry.unregister(channel_id).await;
        }
    }

    /// Front-end side went away: tear down the host leg too.
    pub async fn close_channel(&self, channel_id: &str) {
        self.registry.unregister(channel_id).await;
        self.connector.disconnect(channel_id).await;
        self.reassembler.purge_channel(channel_id).await;
        info!(channel_id, "channel closed by front-end");
    }

    /// Host side went away: clear the connection record, disconnect the
    /// paired front-end port, purge reassembly state, and signal the
    /// degraded state to the embedding host application.
    pub async fn handle_host_disconnect(&self, channel_id: &str) {
        self.connector.disconnect(channel_id).await;
        self.registry.unregister(channel_id).await;
        self.reassembler.purge_channel(channel_id).await;
        self.status.publish(channel_id, PluginStatus::LoadError);
        info!(channel_id, "native host disconnected, channel torn down");
    }
}
