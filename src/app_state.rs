//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::buffer::{EventBuffer, MemoryEventBuffer, RedisEventBuffer};
use crate::config::GatewayConfig;
use crate::domain::{AuthPolicy, Clock};
use crate::error::GatewayError;
use crate::persistence::{
    AnalyticsStore, InquiryStore, MemoryAnalyticsStore, MemoryInquiryStore, MemorySnapshotStore,
    PostgresAnalyticsStore, PostgresInquiryStore, PostgresSnapshotStore, SnapshotStore,
    run_migrations,
};
use crate::service::{
    AnalyticsService, InquiryService, PricingCache, PricingService, PricingSyncService,
};
use crate::sheets::{GoogleSheetsSource, SheetSource, StaticSheetSource};

/// External collaborators the services are built on.
#[derive(Debug, Clone)]
pub struct Backends {
    /// Pricing spreadsheet.
    pub source: Arc<dyn SheetSource>,
    /// Snapshot store and sync log.
    pub snapshots: Arc<dyn SnapshotStore>,
    /// Durable analytics store.
    pub analytics: Arc<dyn AnalyticsStore>,
    /// Inquiry records.
    pub inquiries: Arc<dyn InquiryStore>,
    /// Fast event buffer.
    pub buffer: Arc<dyn EventBuffer>,
}

impl Backends {
    /// Connects the production backends described by `config`.
    ///
    /// Without `PERSISTENCE_ENABLED` the stores live in memory; without
    /// `REDIS_URL` the buffer does; without a spreadsheet id every sync
    /// fails with "source unavailable". Each fallback is logged.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if PostgreSQL cannot be
    /// reached or migrated, a [`GatewayError::BufferError`] if Redis cannot
    /// be reached and a [`GatewayError::SourceUnavailable`] if the HTTP
    /// client for the spreadsheet cannot be built.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let (snapshots, analytics, inquiries): (
            Arc<dyn SnapshotStore>,
            Arc<dyn AnalyticsStore>,
            Arc<dyn InquiryStore>,
        ) = if config.persistence_enabled {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .min_connections(config.database_min_connections)
                .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
                .connect(&config.database_url)
                .await?;
            run_migrations(&pool).await?;
            tracing::info!(
                max_connections = config.database_max_connections,
                "connected to postgres"
            );
            (
                Arc::new(PostgresSnapshotStore::new(
                    pool.clone(),
                    config.pricing_snapshot_retention,
                )),
                Arc::new(PostgresAnalyticsStore::new(pool.clone())),
                Arc::new(PostgresInquiryStore::new(pool)),
            )
        } else {
            tracing::warn!("persistence disabled, snapshots and analytics are kept in memory");
            (
                Arc::new(MemorySnapshotStore::new(config.pricing_snapshot_retention)),
                Arc::new(MemoryAnalyticsStore::new()),
                Arc::new(MemoryInquiryStore::new()),
            )
        };

        let buffer: Arc<dyn EventBuffer> = match config.redis_url.as_deref() {
            Some(url) => Arc::new(
                RedisEventBuffer::connect(url, config.analytics_buffer_max_events).await?,
            ),
            None => {
                tracing::warn!("REDIS_URL not set, buffering events in memory");
                Arc::new(MemoryEventBuffer::new(config.analytics_buffer_max_events))
            }
        };

        let source: Arc<dyn SheetSource> = match config.sheets.clone() {
            Some(sheets) => Arc::new(
                GoogleSheetsSource::new(sheets)
                    .map_err(|e| GatewayError::SourceUnavailable(e.to_string()))?,
            ),
            None => {
                tracing::warn!("PRICING_SPREADSHEET_ID not set, pricing sync is disabled");
                let source = StaticSheetSource::new();
                source
                    .set_unavailable(Some("no spreadsheet configured".to_string()))
                    .await;
                Arc::new(source)
            }
        };

        Ok(Self {
            source,
            snapshots,
            analytics,
            inquiries,
            buffer,
        })
    }
}

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Pricing read path and quotes.
    pub pricing: Arc<PricingService>,
    /// Spreadsheet sync.
    pub sync: Arc<PricingSyncService>,
    /// Event intake and flush.
    pub analytics: Arc<AnalyticsService>,
    /// Customer inquiries.
    pub inquiries: Arc<InquiryService>,
    /// Secrets guarding the admin and cron endpoints.
    pub auth: Arc<AuthPolicy>,
}

impl AppState {
    /// Wires the services on top of `backends`.
    #[must_use]
    pub fn new(
        backends: Backends,
        cache_ttl: chrono::Duration,
        auth: AuthPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = Arc::new(PricingCache::new(cache_ttl, Arc::clone(&clock)));
        let pricing = Arc::new(PricingService::new(
            Arc::clone(&backends.snapshots),
            Arc::clone(&cache),
        ));
        let sync = Arc::new(PricingSyncService::new(
            backends.source,
            backends.snapshots,
            cache,
            Arc::clone(&clock),
        ));
        let analytics = Arc::new(AnalyticsService::new(
            backends.buffer,
            Arc::clone(&backends.analytics),
            Arc::clone(&clock),
        ));
        let inquiries = Arc::new(InquiryService::new(
            Arc::clone(&pricing),
            backends.inquiries,
            backends.analytics,
            clock,
        ));
        Self {
            pricing,
            sync,
            analytics,
            inquiries,
            auth: Arc::new(auth),
        }
    }
}
