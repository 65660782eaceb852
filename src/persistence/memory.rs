//! In-memory stores used when PostgreSQL is disabled and in tests.
//!
//! They follow the same contracts as the PostgreSQL stores, including
//! duplicate-skipping on event ids and all-or-nothing batch inserts.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::SyncLog;
use super::{AnalyticsStore, ClientInfo, InquiryStore, SnapshotStore, UNKNOWN_CLIENT};
use crate::domain::pricing::{PricingData, PricingSnapshot};
use crate::domain::session::{InteractionEvent, SessionStatus, UserSession};
use crate::domain::{Cents, CustomerInquiry, InquiryId};
use crate::error::GatewayError;

/// Snapshot store holding the retained versions in a `Vec`.
#[derive(Debug)]
pub struct MemorySnapshotStore {
    snapshots: RwLock<Vec<PricingSnapshot>>,
    sync_log: RwLock<Vec<SyncLog>>,
    retention: usize,
    fail_writes: AtomicBool,
}

impl MemorySnapshotStore {
    /// Creates an empty store keeping the newest `retention` snapshots.
    #[must_use]
    pub fn new(retention: u32) -> Self {
        Self {
            snapshots: RwLock::new(Vec::new()),
            sync_log: RwLock::new(Vec::new()),
            retention: usize::try_from(retention.max(1)).unwrap_or(usize::MAX),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes snapshot writes fail, simulating an unreachable database.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Versions currently retained, oldest first.
    pub async fn versions(&self) -> Vec<i64> {
        self.snapshots.read().await.iter().map(|s| s.version).collect()
    }

    /// Number of logged sync runs.
    pub async fn sync_runs(&self) -> usize {
        self.sync_log.read().await.len()
    }
}

impl Default for MemorySnapshotStore {
    fn default() -> Self {
        Self::new(30)
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn latest(&self) -> Result<Option<PricingSnapshot>, GatewayError> {
        Ok(self.snapshots.read().await.last().cloned())
    }

    async fn save_snapshot(
        &self,
        data: &PricingData,
        synced_by: &str,
        synced_at: DateTime<Utc>,
    ) -> Result<PricingSnapshot, GatewayError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::PersistenceError(
                "snapshot store unavailable".to_string(),
            ));
        }
        let mut snapshots = self.snapshots.write().await;
        let version = snapshots.last().map_or(1, |s| s.version + 1);
        let snapshot = PricingSnapshot {
            version,
            data: data.clone(),
            synced_at,
            synced_by: synced_by.to_string(),
        };
        snapshots.push(snapshot.clone());
        let excess = snapshots.len().saturating_sub(self.retention);
        snapshots.drain(..excess);
        Ok(snapshot)
    }

    async fn record_sync(&self, log: &SyncLog) -> Result<(), GatewayError> {
        self.sync_log.write().await.push(log.clone());
        Ok(())
    }

    async fn last_sync(&self) -> Result<Option<SyncLog>, GatewayError> {
        Ok(self.sync_log.read().await.last().cloned())
    }
}

#[derive(Debug, Default)]
struct AnalyticsTables {
    sessions: HashMap<String, UserSession>,
    events: Vec<InteractionEvent>,
    /// `(session_id, event_id)` pairs already stored.
    event_keys: HashSet<(String, Uuid)>,
    selections: Vec<(Uuid, String, String)>,
}

/// Analytics store keeping sessions and events in process memory.
#[derive(Debug, Default)]
pub struct MemoryAnalyticsStore {
    tables: RwLock<AnalyticsTables>,
    failing_sessions: RwLock<HashSet<String>>,
}

impl MemoryAnalyticsStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes event inserts for `session_id` fail.
    pub async fn fail_session(&self, session_id: impl Into<String>) {
        self.failing_sessions.write().await.insert(session_id.into());
    }

    /// Stored events of a session in insertion order.
    pub async fn events(&self, session_id: &str) -> Vec<InteractionEvent> {
        self.tables
            .read()
            .await
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Number of stored selection rows of a session.
    pub async fn selection_count(&self, session_id: &str) -> usize {
        self.tables
            .read()
            .await
            .selections
            .iter()
            .filter(|(_, s, _)| s == session_id)
            .count()
    }

    /// Removes a session and, like the foreign key cascade, its events.
    pub async fn delete_session(&self, session_id: &str) -> bool {
        let mut tables = self.tables.write().await;
        let existed = tables.sessions.remove(session_id).is_some();
        tables.events.retain(|e| e.session_id != session_id);
        tables.selections.retain(|(_, s, _)| s != session_id);
        tables.event_keys.retain(|(s, _)| s != session_id);
        existed
    }
}

#[async_trait]
impl AnalyticsStore for MemoryAnalyticsStore {
    async fn ensure_session(
        &self,
        session_id: &str,
        client: ClientInfo<'_>,
        seen_at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        tables
            .sessions
            .entry(session_id.to_string())
            .and_modify(|s| s.last_activity = s.last_activity.max(seen_at))
            .or_insert_with(|| UserSession {
                session_id: session_id.to_string(),
                status: SessionStatus::Active,
                ip_address: client.ip_address.unwrap_or(UNKNOWN_CLIENT).to_string(),
                user_agent: client.user_agent.unwrap_or(UNKNOWN_CLIENT).to_string(),
                started_at: seen_at,
                last_activity: seen_at,
                total_price: None,
            });
        Ok(())
    }

    async fn append_events(
        &self,
        session_id: &str,
        events: &[InteractionEvent],
    ) -> Result<u64, GatewayError> {
        if self.failing_sessions.read().await.contains(session_id) {
            return Err(GatewayError::PersistenceError(format!(
                "insert failed for session {session_id}"
            )));
        }
        let mut tables = self.tables.write().await;
        if !tables.sessions.contains_key(session_id) {
            return Err(GatewayError::PersistenceError(format!(
                "foreign key violation: session {session_id} does not exist"
            )));
        }
        let mut inserted = 0u64;
        for event in events {
            if !tables.event_keys.insert((session_id.to_string(), event.id)) {
                continue;
            }
            if event.is_selection() {
                let selection = event.selection_value.clone().unwrap_or_default();
                tables
                    .selections
                    .push((event.id, session_id.to_string(), selection));
            }
            let mut row = event.clone();
            row.session_id = session_id.to_string();
            tables.events.push(row);
            inserted += 1;
        }
        Ok(inserted)
    }

    async fn session(&self, session_id: &str) -> Result<Option<UserSession>, GatewayError> {
        Ok(self.tables.read().await.sessions.get(session_id).cloned())
    }

    async fn event_count(&self, session_id: &str) -> Result<u64, GatewayError> {
        let tables = self.tables.read().await;
        let count = tables
            .events
            .iter()
            .filter(|e| e.session_id == session_id)
            .count();
        Ok(u64::try_from(count).unwrap_or(u64::MAX))
    }

    async fn set_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        session.status = status;
        session.last_activity = session.last_activity.max(at);
        Ok(())
    }

    async fn set_total_price(
        &self,
        session_id: &str,
        total: Cents,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        let mut tables = self.tables.write().await;
        let session = tables
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        session.total_price = Some(total.get());
        session.last_activity = session.last_activity.max(at);
        Ok(())
    }
}

/// Inquiry store keeping records in process memory.
#[derive(Debug, Default)]
pub struct MemoryInquiryStore {
    inquiries: RwLock<HashMap<InquiryId, CustomerInquiry>>,
}

impl MemoryInquiryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InquiryStore for MemoryInquiryStore {
    async fn insert(&self, inquiry: &CustomerInquiry) -> Result<(), GatewayError> {
        let mut map = self.inquiries.write().await;
        if map.contains_key(&inquiry.id) {
            return Err(GatewayError::PersistenceError(format!(
                "duplicate inquiry id {}",
                inquiry.id
            )));
        }
        map.insert(inquiry.id, inquiry.clone());
        Ok(())
    }

    async fn get(&self, id: InquiryId) -> Result<Option<CustomerInquiry>, GatewayError> {
        Ok(self.inquiries.read().await.get(&id).cloned())
    }
}
