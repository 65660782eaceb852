//! Persistence layer: pricing snapshots, sync log, analytics sessions and
//! customer inquiries.
//!
//! Each concern is a trait so that services can run against PostgreSQL
//! (`sqlx::PgPool`) in production and against the in-memory stores in
//! development and tests.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::pricing::{PricingData, PricingSnapshot};
use crate::domain::session::{InteractionEvent, SessionStatus, UserSession};
use crate::domain::{Cents, CustomerInquiry, InquiryId};
use crate::error::GatewayError;

pub use memory::{MemoryAnalyticsStore, MemoryInquiryStore, MemorySnapshotStore};
pub use models::{SyncLog, SyncStatus};
pub use postgres::{
    PostgresAnalyticsStore, PostgresInquiryStore, PostgresSnapshotStore, run_migrations,
};

/// Value written for client metadata the flush does not know.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Versioned pricing snapshots and the sync log.
#[async_trait]
pub trait SnapshotStore: Send + Sync + std::fmt::Debug {
    /// Returns the snapshot with the highest version.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn latest(&self) -> Result<Option<PricingSnapshot>, GatewayError>;

    /// Writes `data` as the next version and prunes versions beyond the
    /// retention window, atomically.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure;
    /// nothing is written in that case.
    async fn save_snapshot(
        &self,
        data: &PricingData,
        synced_by: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<PricingSnapshot, GatewayError>;

    /// Appends a sync run to the log.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn record_sync(&self, log: &SyncLog) -> Result<(), GatewayError>;

    /// Returns the most recent sync run.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn last_sync(&self) -> Result<Option<SyncLog>, GatewayError>;
}

/// Client metadata used when a session row has to be created.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientInfo<'a> {
    /// Remote address.
    pub ip_address: Option<&'a str>,
    /// `User-Agent` header.
    pub user_agent: Option<&'a str>,
}

/// Durable analytics storage: sessions and their append-only events.
#[async_trait]
pub trait AnalyticsStore: Send + Sync + std::fmt::Debug {
    /// Creates the session if it does not exist (status `ACTIVE`) and
    /// moves `last_activity` forward to `seen_at`.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn ensure_session(
        &self,
        session_id: &str,
        client: ClientInfo<'_>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    /// Inserts events in order, skipping ids that already exist, and the
    /// selection rows derived from them. Returns the number of newly
    /// inserted interaction events.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure; no
    /// event of the batch is kept in that case.
    async fn append_events(
        &self,
        session_id: &str,
        events: &[InteractionEvent],
    ) -> Result<u64, GatewayError>;

    /// Loads a session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn session(&self, session_id: &str) -> Result<Option<UserSession>, GatewayError>;

    /// Number of stored interaction events of a session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn event_count(&self, session_id: &str) -> Result<u64, GatewayError>;

    /// Sets the lifecycle status. Transition rules are checked by the
    /// caller.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;

    /// Records the latest quoted total of a session.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn set_total_price(
        &self,
        session_id: &str,
        total: Cents,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError>;
}

/// Customer inquiry records.
#[async_trait]
pub trait InquiryStore: Send + Sync + std::fmt::Debug {
    /// Stores a new inquiry.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn insert(&self, inquiry: &CustomerInquiry) -> Result<(), GatewayError>;

    /// Loads an inquiry by id.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on storage failure.
    async fn get(&self, id: InquiryId) -> Result<Option<CustomerInquiry>, GatewayError>;
}
