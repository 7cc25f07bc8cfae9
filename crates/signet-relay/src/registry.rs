//! Channel registry mapping channel ids to front-end ports.
//!
//! One entry per live front-end context. The registry holds the only
//! long-lived clone of each connection's outbound sender, so removing an
//! entry closes that connection's writer and with it the front-end
//! transport. The dispatcher owns the teardown protocol and calls
//! [`unregister`] on every teardown path so neither leg of a channel is
//! silently orphaned. A torn-down channel id is never reused.
//!
//! [`unregister`]: ChannelRegistry::unregister

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use tracing::{info, warn};

/// Registry of live channels. Shared across channel tasks; lock scope is a
/// single map operation, never held across transport I/O.
#[derive(Default)]
pub struct ChannelRegistry {
    channels: RwLock<HashMap<String, mpsc::Sender<Value>>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a front-end port for a channel. A colliding registration
    /// replaces the old port; channel ids are caller-generated and unique
    /// per front-end context, so a collision means the context
    /// re-registered.
    pub async fn register(&self, channel_id: &str, front_end: mpsc::Sender<Value>) {
        let replaced = self
            .channels
            .write()
            .await
            .insert(channel_id.to_string(), front_end)
            .is_some();
        if replaced {
            warn!(channel_id, "replaced existing front-end port");
        } else {
            info!(channel_id, "channel registered");
        }
    }

    /// Front-end port for a channel, if one is registered.
    pub async fn lookup(&self, channel_id: &str) -> Option<mpsc::Sender<Value>> {
        self.channels.read().await.get(channel_id).cloned()
    }

    /// Remove a channel. Dropping the entry drops the registry's clone of
    /// the front-end sender; as the registry holds the only long-lived
    /// clone, this ends the connection's writer and closes the front-end
    /// transport. Returns whether an entry existed.
    pub async fn unregister(&self, channel_id: &str) -> bool {
        let removed = self.channels.write().await.remove(channel_id).is_some();
        if removed {
            info!(channel_id, "channel unregistered");
        }
        removed
    }

    /// Number of live channels.
    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_lookup_unregister() {
        let registry = ChannelRegistry::new();
        let (tx, _rx) = mpsc::channel(4);

        registry.register("tab-1", tx).await;
        assert_eq!(registry.len().await, 1);
        assert!(registry.lookup("tab-1").await.is_some());

        assert!(registry.unregister("tab-1").await);
        assert!(registry.lookup("tab-1").await.is_none());
        assert!(!registry.unregister("tab-1").await);
    }

    #[tokio::test]
    async fn unregister_closes_the_port() {
        let registry = ChannelRegistry::new();
        let (tx, mut rx) = mpsc::channel::<Value>(4);

        registry.register("tab-1", tx).await;
        registry.unregister("tab-1").await;
        // The registry held the only sender; the receiver observes closure.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn reregistration_replaces_port() {
        let registry = ChannelRegistry::new();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        registry.register("tab-1", tx1).await;
        registry.register("tab-1", tx2).await;
        assert_eq!(registry.len().await, 1);

        let port = registry.lookup("tab-1").await.unwrap();
        port.send(serde_json::json!({"n": 1})).await.unwrap();
        assert!(rx2.try_recv().is_ok());
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn unregister_is_scoped_to_one_channel() {
        let registry = ChannelRegistry::new();
        let (tx1, _rx1) = mpsc::channel(4);
        let (tx2, _rx2) = mpsc::channel(4);

        registry.register("tab-1", tx1).await;
        registry.register("tab-2", tx2).await;
        registry.unregister("tab-1").await;

        assert!(registry.lookup("tab-1").await.is_none());
        assert!(registry.lookup("tab-2").await.is_some());
    }
}
