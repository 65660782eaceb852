//! PostgreSQL implementation of the persistence layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::models::{SyncLog, SyncStatus};
use super::{AnalyticsStore, ClientInfo, InquiryStore, SnapshotStore, UNKNOWN_CLIENT};
use crate::domain::calculator::PriceBreakdown;
use crate::domain::pricing::{PricingChange, PricingData, PricingSnapshot};
use crate::domain::session::{InteractionEvent, SessionStatus, UserSession};
use crate::domain::{Cents, Configuration, CustomerInquiry, InquiryId};
use crate::error::GatewayError;

/// Applies the embedded migrations.
///
/// # Errors
///
/// Returns a [`GatewayError::PersistenceError`] if a migration fails.
pub async fn run_migrations(pool: &PgPool) -> Result<(), GatewayError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))
}

/// Snapshot store backed by `pricing_snapshots` and `pricing_sync_log`.
#[derive(Debug, Clone)]
pub struct PostgresSnapshotStore {
    pool: PgPool,
    retention: u32,
}

impl PostgresSnapshotStore {
    /// Creates a store keeping the newest `retention` snapshots.
    #[must_use]
    pub fn new(pool: PgPool, retention: u32) -> Self {
        Self {
            pool,
            retention: retention.max(1),
        }
    }
}

type SyncLogRow = (
    DateTime<Utc>,
    String,
    String,
    i64,
    i64,
    i64,
    i64,
    Json<Vec<String>>,
    Json<Vec<PricingChange>>,
    Option<i64>,
    i64,
);

fn count_from_db(value: i64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

#[async_trait]
impl SnapshotStore for PostgresSnapshotStore {
    async fn latest(&self) -> Result<Option<PricingSnapshot>, GatewayError> {
        let row = sqlx::query_as::<_, (i64, Json<PricingData>, DateTime<Utc>, String)>(
            "SELECT version, data, synced_at, synced_by FROM pricing_snapshots \
             ORDER BY version DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(version, Json(data), synced_at, synced_by)| PricingSnapshot {
            version,
            data,
            synced_at,
            synced_by,
        }))
    }

    async fn save_snapshot(
        &self,
        data: &PricingData,
        synced_by: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<PricingSnapshot, GatewayError> {
        let mut tx = self.pool.begin().await?;

        // Serialises version allocation across gateway instances.
        sqlx::query("LOCK TABLE pricing_snapshots IN SHARE ROW EXCLUSIVE MODE")
            .execute(&mut *tx)
            .await?;

        let version = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM pricing_snapshots",
        )
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO pricing_snapshots (version, data, synced_at, synced_by) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(version)
        .bind(Json(data))
        .bind(synced_at)
        .bind(synced_by)
        .execute(&mut *tx)
        .await?;

        let pruned = sqlx::query("DELETE FROM pricing_snapshots WHERE version <= $1")
            .bind(version - i64::from(self.retention))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        tracing::debug!(version, pruned, "pricing snapshot committed");
        Ok(PricingSnapshot {
            version,
            data: data.clone(),
            synced_at,
            synced_by: synced_by.to_string(),
        })
    }

    async fn record_sync(&self, log: &SyncLog) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO pricing_sync_log (synced_at, triggered_by, status, items_added, \
             items_updated, items_removed, items_unchanged, errors, changes, version, duration_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(log.synced_at)
        .bind(&log.triggered_by)
        .bind(log.status.as_str())
        .bind(i64::from(log.items_added))
        .bind(i64::from(log.items_updated))
        .bind(i64::from(log.items_removed))
        .bind(i64::from(log.items_unchanged))
        .bind(Json(&log.errors))
        .bind(Json(&log.changes))
        .bind(log.version)
        .bind(i64::try_from(log.duration_ms).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn last_sync(&self) -> Result<Option<SyncLog>, GatewayError> {
        let row = sqlx::query_as::<_, SyncLogRow>(
            "SELECT synced_at, triggered_by, status, items_added, items_updated, items_removed, \
             items_unchanged, errors, changes, version, duration_ms \
             FROM pricing_sync_log ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let Some((
            synced_at,
            triggered_by,
            status,
            added,
            updated,
            removed,
            unchanged,
            Json(errors),
            Json(changes),
            version,
            duration_ms,
        )) = row
        else {
            return Ok(None);
        };

        let status = status
            .parse::<SyncStatus>()
            .map_err(GatewayError::PersistenceError)?;

        Ok(Some(SyncLog {
            synced_at,
            triggered_by,
            status,
            items_added: count_from_db(added),
            items_updated: count_from_db(updated),
            items_removed: count_from_db(removed),
            items_unchanged: count_from_db(unchanged),
            errors,
            changes,
            version,
            duration_ms: u64::try_from(duration_ms).unwrap_or(0),
        }))
    }
}

/// Analytics store backed by `user_sessions`, `interaction_events` and
/// `selection_events`.
#[derive(Debug, Clone)]
pub struct PostgresAnalyticsStore {
    pool: PgPool,
}

impl PostgresAnalyticsStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalyticsStore for PostgresAnalyticsStore {
    async fn ensure_session(
        &self,
        session_id: &str,
        client: ClientInfo<'_>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO user_sessions (session_id, status, ip_address, user_agent, started_at, last_activity) \
             VALUES ($1, 'ACTIVE', $2, $3, $4, $4) \
             ON CONFLICT (session_id) DO UPDATE \
             SET last_activity = GREATEST(user_sessions.last_activity, EXCLUDED.last_activity)",
        )
        .bind(session_id)
        .bind(client.ip_address.unwrap_or(UNKNOWN_CLIENT))
        .bind(client.user_agent.unwrap_or(UNKNOWN_CLIENT))
        .bind(seen_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_events(
        &self,
        session_id: &str,
        events: &[InteractionEvent],
    ) -> Result<u64, GatewayError> {
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0u64;

        for event in events {
            let rows = sqlx::query(
                "INSERT INTO interaction_events (id, session_id, event_type, category, element_id, \
                 selection_value, event_timestamp, flushed_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) ON CONFLICT (session_id, id) DO NOTHING",
            )
            .bind(event.id)
            .bind(session_id)
            .bind(&event.event_type)
            .bind(&event.category)
            .bind(event.element_id.as_deref())
            .bind(event.selection_value.as_deref())
            .bind(event.timestamp)
            .bind(event.flushed_at)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if rows == 0 {
                continue;
            }
            inserted += rows;

            if event.is_selection() {
                sqlx::query(
                    "INSERT INTO selection_events (event_id, session_id, category, selection, selected_at) \
                     VALUES ($1, $2, $3, $4, $5) ON CONFLICT (session_id, event_id) DO NOTHING",
                )
                .bind(event.id)
                .bind(session_id)
                .bind(&event.category)
                .bind(event.selection_value.as_deref())
                .bind(event.timestamp)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    async fn session(&self, session_id: &str) -> Result<Option<UserSession>, GatewayError> {
        let row = sqlx::query_as::<
            _,
            (String, String, String, String, DateTime<Utc>, DateTime<Utc>, Option<i64>),
        >(
            "SELECT session_id, status, ip_address, user_agent, started_at, last_activity, total_price \
             FROM user_sessions WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(
            |(session_id, status, ip_address, user_agent, started_at, last_activity, total_price)| {
                Ok(UserSession {
                    session_id,
                    status: status.parse().map_err(GatewayError::PersistenceError)?,
                    ip_address,
                    user_agent,
                    started_at,
                    last_activity,
                    total_price,
                })
            },
        )
        .transpose()
    }

    async fn event_count(&self, session_id: &str) -> Result<u64, GatewayError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM interaction_events WHERE session_id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET status = $2, last_activity = GREATEST(last_activity, $3) \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(status.as_str())
        .bind(at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    async fn set_total_price(
        &self,
        session_id: &str,
        total: Cents,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let result = sqlx::query(
            "UPDATE user_sessions SET total_price = $2, last_activity = GREATEST(last_activity, $3) \
             WHERE session_id = $1",
        )
        .bind(session_id)
        .bind(total.get())
        .bind(at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(GatewayError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }
}

/// Inquiry store backed by `customer_inquiries`.
#[derive(Debug, Clone)]
pub struct PostgresInquiryStore {
    pool: PgPool,
}

impl PostgresInquiryStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type InquiryRow = (
    Uuid,
    Option<String>,
    String,
    String,
    Option<String>,
    Json<Configuration>,
    Json<PriceBreakdown>,
    i64,
    i64,
    DateTime<Utc>,
);

#[async_trait]
impl InquiryStore for PostgresInquiryStore {
    async fn insert(&self, inquiry: &CustomerInquiry) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO customer_inquiries (id, session_id, name, email, message, configuration, \
             breakdown, total_price, pricing_version, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(*inquiry.id.as_uuid())
        .bind(inquiry.session_id.as_deref())
        .bind(&inquiry.name)
        .bind(&inquiry.email)
        .bind(inquiry.message.as_deref())
        .bind(Json(&inquiry.configuration))
        .bind(Json(&inquiry.breakdown))
        .bind(inquiry.total_price.get())
        .bind(inquiry.pricing_version)
        .bind(inquiry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: InquiryId) -> Result<Option<CustomerInquiry>, GatewayError> {
        let row = sqlx::query_as::<_, InquiryRow>(
            "SELECT id, session_id, name, email, message, configuration, breakdown, total_price, \
             pricing_version, created_at FROM customer_inquiries WHERE id = $1",
        )
        .bind(*id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(
                id,
                session_id,
                name,
                email,
                message,
                Json(configuration),
                Json(breakdown),
                total_price,
                pricing_version,
                created_at,
            )| CustomerInquiry {
                id: InquiryId::from_uuid(id),
                session_id,
                name,
                email,
                message,
                configuration,
                breakdown,
                total_price: Cents::new(total_price),
                pricing_version,
                created_at,
            },
        ))
    }
}
