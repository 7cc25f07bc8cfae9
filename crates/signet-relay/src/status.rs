//! Channel status signals for the embedding host application.
//!
//! The relay renders nothing; it publishes opaque load-state events that the
//! host application (browser chrome) maps to whatever indicator it shows.

use tokio::sync::broadcast;
use tracing::debug;

/// Plugin load state for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// Channel established; host connection is up.
    LoadOk,
    /// Host connection failed or was lost; channel torn down.
    LoadError,
}

/// Status change for a channel.
#[derive(Debug, Clone)]
pub struct StatusEvent {
    pub channel_id: String,
    pub status: PluginStatus,
}

/// Fan-out of status events to however many embedding consumers subscribe.
/// Publishing with no subscribers is a no-op.
#[derive(Clone)]
pub struct StatusBroadcaster {
    tx: broadcast::Sender<StatusEvent>,
}

impl StatusBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, channel_id: &str, status: PluginStatus) {
        debug!(channel_id, ?status, "status event");
        let _ = self.tx.send(StatusEvent {
            channel_id: channel_id.to_string(),
            status,
        });
    }
}

impl Default for StatusBroadcaster {
    fn default() -> Self {
        Self::new(16)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events() {
        let broadcaster = StatusBroadcaster::default();
        let mut rx = broadcaster.subscribe();

        broadcaster.publish("tab-1", PluginStatus::LoadOk);
        broadcaster.publish("tab-1", PluginStatus::LoadError);

        let first = rx.recv().await.unwrap();
        assert_eq!(first.channel_id, "tab-1");
        assert_eq!(first.status, PluginStatus::LoadOk);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.status, PluginStatus::LoadError);
    }

    #[test]
    fn publish_without_subscribers_is_noop() {
        let broadcaster = StatusBroadcaster::default();
        broadcaster.publish("tab-1", PluginStatus::LoadOk);
    }
}
