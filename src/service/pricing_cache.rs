//! Time-bounded in-memory cache of the active pricing snapshot.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::domain::{Clock, PricingSnapshot};

#[derive(Debug)]
struct CachedSnapshot {
    snapshot: Arc<PricingSnapshot>,
    expires_at: DateTime<Utc>,
}

/// Holds at most one snapshot for `ttl`.
///
/// Readers share the snapshot through an `Arc`; a sync invalidates the
/// entry after writing a new version.
#[derive(Debug)]
pub struct PricingCache {
    entry: RwLock<Option<CachedSnapshot>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl PricingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: RwLock::new(None),
            ttl,
            clock,
        }
    }

    /// Returns the cached snapshot unless it has expired.
    pub async fn get(&self) -> Option<Arc<PricingSnapshot>> {
        let now = self.clock.now();
        self.entry
            .read()
            .await
            .as_ref()
            .filter(|cached| now < cached.expires_at)
            .map(|cached| Arc::clone(&cached.snapshot))
    }

    /// Stores `snapshot` for one TTL from now.
    pub async fn set(&self, snapshot: Arc<PricingSnapshot>) {
        let expires_at = self.clock.now() + self.ttl;
        *self.entry.write().await = Some(CachedSnapshot {
            snapshot,
            expires_at,
        });
    }

    /// Drops the cached snapshot.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }
}
