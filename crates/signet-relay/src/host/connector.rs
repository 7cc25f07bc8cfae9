//! Native host connection lifecycle.
//!
//! One host process per channel, spawned lazily when the channel opens. The
//! connector owns the per-channel outbound queue; a send with no live
//! connection (or a dead one) synthesizes an error message to the channel's
//! front-end port and clears the connection record so the next attempt
//! reconnects instead of reusing a dead handle.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use serde_json::Value;
use tokio::io::BufReader;
use tokio::process::{Child, Command};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, error, info, warn};

use signet_core::{Error, Result, wire};

use super::codec;
use crate::registry::ChannelRegistry;

/// Configuration for spawning native host processes.
#[derive(Debug, Clone)]
pub struct HostConnectorConfig {
    /// Host command, e.g. the native messaging host binary.
    pub command: PathBuf,
    /// Arguments passed to every host process.
    pub args: Vec<String>,
    /// Capacity of the outbound per-channel message queue.
    pub channel_capacity: usize,
}

impl HostConnectorConfig {
    pub fn new(command: PathBuf) -> Self {
        Self {
            command,
            args: Vec::new(),
            channel_capacity: 64,
        }
    }
}

/// Event emitted by a host connection's reader task.
#[derive(Debug)]
pub enum HostEvent {
    /// One decoded frame from the host.
    Frame(Value),
    /// The host closed its side (EOF or framing error). Terminal.
    Disconnected,
}

struct HostPort {
    tx: mpsc::Sender<Value>,
    /// Absent for transports attached by the embedder rather than spawned.
    child: Option<Child>,
}

/// Owns the transport to the native host for each channel.
pub struct HostConnector {
    config: HostConnectorConfig,
    registry: Arc<ChannelRegistry>,
    ports: Arc<RwLock<HashMap<String, HostPort>>>,
}

/// Failure path shared by [`HostConnector::send`] and the per-connection
/// writer task: clear the connection record (killing a spawned host) and
/// deliver exactly one synthetic error for the failed request to the
/// channel's front-end port.
async fn report_send_failure(
    ports: &RwLock<HashMap<String, HostPort>>,
    registry: &ChannelRegistry,
    channel_id: &str,
    request_id: &Value,
) {
    if let Some(mut port) = ports.write().await.remove(channel_id) {
        if let Some(child) = port.child.as_mut() {
            let _ = child.start_kill();
        }
        info!(channel_id, "native host connection closed");
    }
    if let Some(front) = registry.lookup(channel_id).await {
        let _ = front
            .send(wire::host_send_error(channel_id, request_id))
            .await;
    }
}

fn request_id_of(message: &Value) -> Value {
    message
        .get("data")
        .and_then(|data| data.get("requestid"))
        .cloned()
        .unwrap_or(Value::Null)
}

impl HostConnector {
    pub fn new(config: HostConnectorConfig, registry: Arc<ChannelRegistry>) -> Self {
        Self {
            config,
            registry,
            ports: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Spawn a host process for a channel and wire up its framed stdio.
    ///
    /// Returns the event stream for the connection. At most one live host
    /// connection may exist per channel; connecting an already-connected
    /// channel is a protocol error.
    pub async fn connect(&self, channel_id: &str) -> Result<mpsc::Receiver<HostEvent>> {
        if self.is_connected(channel_id).await {
            return Err(Error::Protocol(format!(
                "channel {channel_id} already has a live host connection"
            )));
        }

        info!(channel_id, command = %self.config.command.display(), "connecting to native host");
        let mut child = Command::new(&self.config.command)
            .args(&self.config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Protocol("host process has no stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Protocol("host process has no stdout".to_string()))?;

        let (tx, mut outbound_rx) = mpsc::channel::<Value>(self.config.channel_capacity);
        let (event_tx, event_rx) = mpsc::channel::<HostEvent>(self.config.channel_capacity);

        // Writer: drains the outbound queue into framed stdin. A failed
        // write takes the same failure path as a failed send: the message
        // already left the queue, so its synthetic error must be delivered
        // here, and the connection record cleared for reconnect.
        let writer_channel = channel_id.to_string();
        let writer_ports = Arc::clone(&self.ports);
        let writer_registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let mut stdin = stdin;
            while let Some(message) = outbound_rx.recv().await {
                if let Err(e) = codec::write_frame(&mut stdin, &message).await {
                    warn!(channel_id = %writer_channel, error = %e, "host stdin write failed");
                    report_send_failure(
                        &writer_ports,
                        &writer_registry,
                        &writer_channel,
                        &request_id_of(&message),
                    )
                    .await;
                    break;
                }
            }
        });

        // Reader: decodes frames until EOF or a framing error, then signals
        // disconnect exactly once.
        let reader_channel = channel_id.to_string();
        tokio::spawn(async move {
            let mut stdout = BufReader::new(stdout);
            loop {
                match codec::read_frame(&mut stdout).await {
                    Ok(Some(frame)) => {
                        if event_tx.send(HostEvent::Frame(frame)).await.is_err() {
                            return;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        error!(channel_id = %reader_channel, error = %e, "host stdout read failed");
                        break;
                    }
                }
            }
            let _ = event_tx.send(HostEvent::Disconnected).await;
        });

        self.ports.write().await.insert(
            channel_id.to_string(),
            HostPort {
                tx,
                child: Some(child),
            },
        );
        Ok(event_rx)
    }

    /// Attach a caller-managed host transport instead of spawning a process.
    ///
    /// Used when the host side is a single physical pipe multiplexed across
    /// channels (the embedder demultiplexes and feeds inbound frames to the
    /// dispatcher itself), and by tests.
    pub async fn attach_transport(&self, channel_id: &str, tx: mpsc::Sender<Value>) {
        self.ports
            .write()
            .await
            .insert(channel_id.to_string(), HostPort { tx, child: None });
        info!(channel_id, "attached external host transport");
    }

    /// Send a message to the channel's host connection.
    ///
    /// On failure -- no connection, or the connection's writer is gone --
    /// delivers exactly one synthetic error message to the channel's
    /// front-end port, clears the connection record, and returns
    /// [`Error::HostUnavailable`].
    pub async fn send(&self, channel_id: &str, message: Value) -> Result<()> {
        let request_id = request_id_of(&message);

        let tx = self
            .ports
            .read()
            .await
            .get(channel_id)
            .map(|port| port.tx.clone());

        let delivered = match tx {
            Some(tx) => tx.send(message).await.is_ok(),
            None => false,
        };
        if delivered {
            debug!(channel_id, "sent native message");
            return Ok(());
        }

        error!(channel_id, "failed to send message to native host");
        report_send_failure(&self.ports, &self.registry, channel_id, &request_id).await;
        Err(Error::HostUnavailable {
            channel_id: channel_id.to_string(),
        })
    }

    /// Clear the connection record for a channel and kill its host process
    /// if one was spawned. Idempotent.
    pub async fn disconnect(&self, channel_id: &str) {
        if let Some(mut port) = self.ports.write().await.remove(channel_id) {
            if let Some(child) = port.child.as_mut() {
                let _ = child.start_kill();
            }
            info!(channel_id, "native host connection closed");
        }
    }

    /// Whether the channel currently has a live connection record.
    pub async fn is_connected(&self, channel_id: &str) -> bool {
        self.ports.read().await.contains_key(channel_id)
    }
}
