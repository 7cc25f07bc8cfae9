//! Signet Relay
//!
//! Long-running daemon multiplexing tab-scoped front-end channels over
//! per-channel connections to the native signing host.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use signet_core::{Config, LogLevel, logging};
use signet_relay::dispatcher::{Relay, RelayOptions};
use signet_relay::host::{HostConnector, HostConnectorConfig};
use signet_relay::registry::ChannelRegistry;
use signet_relay::server::{FrontEndServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "signet-relay")]
#[command(version, about = "Signet relay - native signing host multiplexer")]
struct Args {
    /// Unix socket path for front-end connections
    #[arg(long, env = "SIGNET_SOCKET")]
    socket_path: Option<PathBuf>,

    /// Command used to spawn the native host (one process per channel)
    #[arg(long, env = "SIGNET_HOST_CMD")]
    host_cmd: Option<PathBuf>,

    /// Extra argument passed to the host command (repeatable)
    #[arg(long = "host-arg")]
    host_args: Vec<String>,

    /// Acknowledge fragments with get_part control messages (transport variant B)
    #[arg(long, env = "SIGNET_FRAGMENT_ACK")]
    fragment_ack: bool,

    /// Log level filter: "error", "info" or "debug"
    #[arg(long, env = "SIGNET_LOG_LEVEL")]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "SIGNET_LOG_JSON")]
    log_json: bool,

    /// Path to a JSON config file
    #[arg(long, env = "SIGNET_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = Config::load_or_default(args.config.as_deref())?;

    let level: LogLevel = args
        .log_level
        .as_deref()
        .unwrap_or(&config.relay.log_level)
        .parse()?;
    let log_handle = logging::init_tracing(level, args.log_json || config.relay.log_json);

    let socket_path = args
        .socket_path
        .or(config.relay.socket_path.clone())
        .unwrap_or_else(|| PathBuf::from("/tmp/signet-relay.sock"));
    let host_cmd = args
        .host_cmd
        .or(config.host.command.clone())
        .context("no native host command configured (--host-cmd or config file)")?;
    let host_args = if args.host_args.is_empty() {
        config.host.args.clone()
    } else {
        args.host_args
    };

    let registry = Arc::new(ChannelRegistry::new());
    let connector = Arc::new(HostConnector::new(
        HostConnectorConfig {
            command: host_cmd,
            args: host_args,
            channel_capacity: config.host.channel_capacity,
        },
        Arc::clone(&registry),
    ));
    let relay = Relay::new(
        registry,
        connector,
        RelayOptions {
            fragment_ack: args.fragment_ack || config.host.fragment_ack,
            approval_ttl: Duration::from_secs(config.relay.approval_ttl_secs),
        },
        Some(log_handle),
    );

    let mut server_config = ServerConfig::new(socket_path);
    server_config.max_line_bytes = config.relay.max_line_bytes;

    info!("signet-relay starting");
    FrontEndServer::new(relay, server_config).run().await?;
    Ok(())
}
