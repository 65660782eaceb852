//! Read path for pricing data and quotes.

use std::sync::Arc;

use super::pricing_cache::PricingCache;
use crate::domain::{Configuration, PriceBreakdown, PricingSnapshot, calculate_price};
use crate::error::GatewayError;
use crate::persistence::SnapshotStore;

/// Outcome of a pricing lookup.
#[derive(Debug, Clone)]
pub enum PricingLookup {
    /// A snapshot exists.
    Available {
        /// The active snapshot.
        snapshot: Arc<PricingSnapshot>,
        /// `true` if it was served from the in-memory cache.
        cached: bool,
    },
    /// No sync has ever written a snapshot.
    NotSynced,
}

/// A priced configuration and the snapshot version it was priced with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Full derivation.
    pub breakdown: PriceBreakdown,
    /// Snapshot version used.
    pub pricing_version: i64,
}

/// Serves the active snapshot from the cache or the snapshot store. Never
/// reads the spreadsheet.
#[derive(Debug, Clone)]
pub struct PricingService {
    store: Arc<dyn SnapshotStore>,
    cache: Arc<PricingCache>,
}

impl PricingService {
    /// Creates the read path over `store` and `cache`.
    #[must_use]
    pub fn new(store: Arc<dyn SnapshotStore>, cache: Arc<PricingCache>) -> Self {
        Self { store, cache }
    }

    /// Returns the active snapshot.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the cache is cold and
    /// the store cannot be read.
    pub async fn current(&self) -> Result<PricingLookup, GatewayError> {
        if let Some(snapshot) = self.cache.get().await {
            return Ok(PricingLookup::Available {
                snapshot,
                cached: true,
            });
        }

        match self.store.latest().await? {
            Some(snapshot) => {
                let snapshot = Arc::new(snapshot);
                self.cache.set(Arc::clone(&snapshot)).await;
                tracing::debug!(version = snapshot.version, "pricing cache refreshed");
                Ok(PricingLookup::Available {
                    snapshot,
                    cached: false,
                })
            }
            None => Ok(PricingLookup::NotSynced),
        }
    }

    /// Like [`current`](Self::current) but treats "never synced" as an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PricingNotAvailable`] before the first sync.
    pub async fn require_current(&self) -> Result<Arc<PricingSnapshot>, GatewayError> {
        match self.current().await? {
            PricingLookup::Available { snapshot, .. } => Ok(snapshot),
            PricingLookup::NotSynced => Err(GatewayError::PricingNotAvailable),
        }
    }

    /// Prices `configuration` against the active snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PricingNotAvailable`] before the first sync
    /// and [`GatewayError::Pricing`] when the configuration cannot be
    /// priced.
    pub async fn quote(&self, configuration: &Configuration) -> Result<Quote, GatewayError> {
        let snapshot = self.require_current().await?;
        let breakdown = calculate_price(configuration, &snapshot.data)?;
        Ok(Quote {
            breakdown,
            pricing_version: snapshot.version,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::domain::{Cents, PricingData, PricingEntry, SystemClock};
    use crate::persistence::MemorySnapshotStore;

    fn service(store: Arc<MemorySnapshotStore>) -> PricingService {
        let cache = Arc::new(PricingCache::new(Duration::seconds(300), Arc::new(SystemClock)));
        PricingService::new(store, cache)
    }

    #[tokio::test]
    async fn not_synced_before_first_snapshot() {
        let svc = service(Arc::new(MemorySnapshotStore::default()));
        assert!(matches!(svc.current().await, Ok(PricingLookup::NotSynced)));
        assert!(matches!(
            svc.require_current().await,
            Err(GatewayError::PricingNotAvailable)
        ));
    }

    #[tokio::test]
    async fn second_read_is_cached() {
        let store = Arc::new(MemorySnapshotStore::default());
        let mut data = PricingData::new();
        data.insert(
            "nest",
            "nest80",
            PricingEntry::new("Nest 80", Cents::new(17_700_000)).with_square_meters(75),
        );
        assert!(store.save_snapshot(&data, "test", Utc::now()).await.is_ok());

        let svc = service(Arc::clone(&store));
        let Ok(PricingLookup::Available { cached: first, .. }) = svc.current().await else {
            panic!("expected a snapshot");
        };
        let Ok(PricingLookup::Available { cached: second, snapshot }) = svc.current().await else {
            panic!("expected a snapshot");
        };
        assert!(!first);
        assert!(second);
        assert_eq!(snapshot.version, 1);

        let Ok(quote) = svc.quote(&Configuration::new("nest80")).await else {
            panic!("expected a quote");
        };
        assert_eq!(quote.pricing_version, 1);
        assert_eq!(quote.breakdown.total_price, Cents::new(17_700_000));
    }
}
