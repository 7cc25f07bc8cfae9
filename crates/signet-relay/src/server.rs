//! Front-end listener: Unix domain socket, NDJSON protocol.
//!
//! Each accepted connection carries one channel. The first envelope on a
//! connection binds its channel id; envelopes naming a different channel are
//! a protocol violation and dropped. Connection loss triggers the full
//! bidirectional channel teardown.

use std::path::PathBuf;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use signet_core::Result;
use signet_core::wire::{self, FrontMessage};

use crate::dispatcher::Relay;

/// Front-end listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket path; a stale file at this path is removed on startup.
    pub socket_path: PathBuf,
    /// Maximum accepted NDJSON line length.
    pub max_line_bytes: usize,
    /// Capacity of each connection's outbound queue.
    pub writer_capacity: usize,
}

impl ServerConfig {
    pub fn new(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            max_line_bytes: 1024 * 1024,
            writer_capacity: 64,
        }
    }
}

/// Accepts front-end connections and feeds them into the dispatcher.
pub struct FrontEndServer {
    relay: Relay,
    config: ServerConfig,
}

impl FrontEndServer {
    pub fn new(relay: Relay, config: ServerConfig) -> Self {
        Self { relay, config }
    }

    /// Bind the socket and serve connections until the process exits.
    pub async fn run(self) -> Result<()> {
        let path = &self.config.socket_path;
        if path.exists() {
            warn!(path = %path.display(), "removing stale socket");
            std::fs::remove_file(path)?;
        }
        let listener = UnixListener::bind(path)?;

        // Owner-only: front-end contexts run as the same user.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
        }

        info!(path = %path.display(), "front-end listener ready");
        loop {
            let (stream, _addr) = listener.accept().await?;
            let relay = self.relay.clone();
            let config = self.config.clone();
            tokio::spawn(async move {
                handle_connection(relay, stream, &config).await;
            });
        }
    }
}

async fn handle_connection(relay: Relay, stream: UnixStream, config: &ServerConfig) {
    let conn_id = Uuid::new_v4();
    debug!(%conn_id, "front-end connected");

    let (read_half, write_half) = stream.into_split();
    let (port_tx, mut port_rx) = mpsc::channel::<Value>(config.writer_capacity);
    // Moved into the registry when the first envelope binds the channel.
    // The registry then holds the only sender, so teardown of either leg
    // ends the writer and closes the stream.
    let mut pending_port = Some(port_tx);

    // Writer: serializes outbound messages for this front-end as NDJSON.
    // Ends when the channel's registry entry is removed.
    let writer_conn = conn_id;
    tokio::spawn(async move {
        let mut writer = write_half;
        while let Some(message) = port_rx.recv().await {
            match serde_json::to_vec(&message) {
                Ok(mut line) => {
                    line.push(b'\n');
                    if writer.write_all(&line).await.is_err() {
                        debug!(conn_id = %writer_conn, "front-end write failed");
                        return;
                    }
                }
                Err(e) => warn!(conn_id = %writer_conn, error = %e, "unserializable message"),
            }
        }
    });

    let mut lines = BufReader::new(read_half).lines();
    let mut bound_channel: Option<String> = None;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(%conn_id, error = %e, "front-end read failed");
                break;
            }
        };
        if line.len() > config.max_line_bytes {
            warn!(%conn_id, bytes = line.len(), "oversize line, disconnecting");
            break;
        }
        if line.is_empty() {
            continue;
        }

        match wire::parse_front_line(&line) {
            Ok(FrontMessage::SetLogLevel(level)) => relay.set_log_level(level),
            Ok(FrontMessage::Request { channel_id, raw }) => {
                match &bound_channel {
                    None => {
                        let Some(port) = pending_port.take() else {
                            break;
                        };
                        if let Err(e) = relay.open_channel(&channel_id, port).await {
                            warn!(%conn_id, %channel_id, error = %e, "channel open failed");
                            break;
                        }
                        bound_channel = Some(channel_id.clone());
                    }
                    Some(bound) if *bound != channel_id => {
                        warn!(%conn_id, %bound, %channel_id, "envelope for foreign channel dropped");
                        continue;
                    }
                    Some(_) => {}
                }
                // Send failures already delivered their synthetic error.
                let _ = relay.send_to_host(&channel_id, raw).await;
            }
            Err(e) => warn!(%conn_id, error = %e, "invalid front-end envelope"),
        }
    }

    if let Some(channel_id) = bound_channel {
        relay.close_channel(&channel_id).await;
    }
    debug!(%conn_id, "front-end disconnected");
}
