//! Time-bounded per-origin approval cache.
//!
//! Gates the host's `approved_site` query: the relay answers from this cache
//! instead of re-prompting the user. The host prompts and records consent;
//! the relay itself never prompts. Records are memory-resident and reset on
//! relay restart.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tracing::debug;

/// Default approval validity window.
pub const DEFAULT_APPROVAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Membership cache keyed by origin, with lazy expiry at read time: an
/// expired record is treated as absent without being deleted.
pub struct ApprovedSiteCache {
    ttl: Duration,
    records: RwLock<HashMap<String, Instant>>,
}

impl ApprovedSiteCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_APPROVAL_TTL)
    }

    /// Record user consent for an origin, valid for the cache TTL from now.
    pub async fn record_approval(&self, origin: &str) {
        self.records
            .write()
            .await
            .insert(origin.to_string(), Instant::now());
        debug!(origin, "origin approved");
    }

    /// Whether an origin has a live approval record.
    pub async fn is_approved(&self, origin: &str) -> bool {
        self.records
            .read()
            .await
            .get(origin)
            .is_some_and(|approved_at| approved_at.elapsed() < self.ttl)
    }
}

impl Default for ApprovedSiteCache {
    fn default() -> Self {
        Self::with_default_ttl()
    }
}
