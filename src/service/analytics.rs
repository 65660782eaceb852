//! Session analytics: event intake, lifecycle updates and the buffer flush.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::buffer::EventBuffer;
use crate::domain::session::validate_session_id;
use crate::domain::{BufferedEvent, Clock, InteractionEvent, SessionStatus, UserSession};
use crate::error::GatewayError;
use crate::persistence::{AnalyticsStore, ClientInfo};

/// A client event before it is buffered.
#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    /// Client-assigned id; generated when absent.
    pub id: Option<Uuid>,
    /// Event kind.
    pub event_type: String,
    /// Configurator category.
    pub category: String,
    /// Element id.
    pub element_id: Option<String>,
    /// Selected value.
    pub value: Option<String>,
    /// Client time; server time when absent.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Outcome of a flush. Never carries an error itself; per-session
/// failures are listed in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlushReport {
    /// Sessions whose buffered events were moved.
    pub sessions_flushed: u32,
    /// Events moved.
    pub events_flushed: u64,
    /// `"<session>: <reason>"` for each failed session.
    pub errors: Vec<String>,
}

/// A stored session and how many events it has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    /// Session row.
    pub session: UserSession,
    /// Stored interaction events.
    pub event_count: u64,
}

/// Owns the path from client events to durable analytics rows.
#[derive(Debug)]
pub struct AnalyticsService {
    buffer: Arc<dyn EventBuffer>,
    store: Arc<dyn AnalyticsStore>,
    clock: Arc<dyn Clock>,
    flushing: Mutex<()>,
}

fn non_empty(field: &str, value: &str) -> Result<(), GatewayError> {
    if value.trim().is_empty() {
        return Err(GatewayError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

impl AnalyticsService {
    /// Creates the service.
    #[must_use]
    pub fn new(
        buffer: Arc<dyn EventBuffer>,
        store: Arc<dyn AnalyticsStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            buffer,
            store,
            clock,
            flushing: Mutex::new(()),
        }
    }

    /// Validates and buffers one event.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for a bad session id or
    /// missing fields and [`GatewayError::BufferError`] if the buffer is
    /// unreachable.
    pub async fn record_event(
        &self,
        session_id: &str,
        event: NewEvent,
    ) -> Result<BufferedEvent, GatewayError> {
        validate_session_id(session_id).map_err(GatewayError::InvalidRequest)?;
        non_empty("eventType", &event.event_type)?;
        non_empty("category", &event.category)?;

        let buffered = BufferedEvent {
            id: event.id.unwrap_or_else(Uuid::new_v4),
            event_type: event.event_type,
            category: event.category,
            element_id: event.element_id,
            value: event.value,
            timestamp: event.timestamp.unwrap_or_else(|| self.clock.now()),
        };
        let payload = serde_json::to_string(&buffered)
            .map_err(|e| GatewayError::Internal(format!("event encoding failed: {e}")))?;
        self.buffer.push(session_id, payload).await?;
        tracing::debug!(session_id, event_id = %buffered.id, "event buffered");
        Ok(buffered)
    }

    /// Moves a session to `status`, creating the session row if the flush
    /// has not done so yet.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidTransition`] if the lifecycle does not
    /// allow the change, [`GatewayError::InvalidRequest`] for a bad id and
    /// [`GatewayError::PersistenceError`] on storage failure.
    pub async fn update_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        client: ClientInfo<'_>,
    ) -> Result<UserSession, GatewayError> {
        validate_session_id(session_id).map_err(GatewayError::InvalidRequest)?;
        let now = self.clock.now();
        self.store.ensure_session(session_id, client, now).await?;

        let current = self
            .store
            .session(session_id)
            .await?
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        if !current.status.can_transition_to(status) {
            return Err(GatewayError::InvalidTransition {
                from: current.status.to_string(),
                to: status.to_string(),
            });
        }
        self.store.set_status(session_id, status, now).await?;
        tracing::info!(session_id, from = %current.status, to = %status, "session status changed");

        Ok(UserSession {
            status,
            last_activity: current.last_activity.max(now),
            ..current
        })
    }

    /// Loads a session with its stored event count.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::SessionNotFound`] if the session has never
    /// been flushed or updated.
    pub async fn session(&self, session_id: &str) -> Result<SessionSummary, GatewayError> {
        let session = self
            .store
            .session(session_id)
            .await?
            .ok_or_else(|| GatewayError::SessionNotFound(session_id.to_string()))?;
        let event_count = self.store.event_count(session_id).await?;
        Ok(SessionSummary {
            session,
            event_count,
        })
    }

    /// Moves every pending session's events to the analytics store.
    ///
    /// Sessions are independent: a failing session is reported in
    /// [`FlushReport::errors`] and keeps its buffered events for the next
    /// run, the others proceed.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::FlushInProgress`] if another flush is active.
    pub async fn flush(&self) -> Result<FlushReport, GatewayError> {
        let Ok(_flushing) = self.flushing.try_lock() else {
            return Err(GatewayError::FlushInProgress);
        };

        let mut report = FlushReport::default();
        let sessions = match self.buffer.pending_sessions().await {
            Ok(sessions) => sessions,
            Err(e) => {
                tracing::error!(error = %e, "could not list pending sessions");
                report.errors.push(format!("buffer: {e}"));
                return Ok(report);
            }
        };

        for session_id in &sessions {
            match self.flush_session(session_id).await {
                Ok(0) => {}
                Ok(events) => {
                    report.sessions_flushed += 1;
                    report.events_flushed += events;
                }
                Err(reason) => {
                    tracing::warn!(session_id = %session_id, %reason, "session flush failed");
                    report.errors.push(format!("{session_id}: {reason}"));
                }
            }
        }

        if !sessions.is_empty() {
            tracing::info!(
                sessions_flushed = report.sessions_flushed,
                events_flushed = report.events_flushed,
                errors = report.errors.len(),
                "analytics flush finished"
            );
        }
        Ok(report)
    }

    async fn flush_session(&self, session_id: &str) -> Result<u64, String> {
        let payloads = self.buffer.read(session_id).await.map_err(|e| e.to_string())?;
        if payloads.is_empty() {
            self.buffer
                .acknowledge(session_id, 0)
                .await
                .map_err(|e| e.to_string())?;
            return Ok(0);
        }

        let flushed_at = self.clock.now();
        let events = payloads
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                serde_json::from_str::<BufferedEvent>(raw)
                    .map(|event| InteractionEvent::from_buffered(session_id, event, flushed_at))
                    .map_err(|e| format!("malformed payload #{i}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let last_seen = events
            .iter()
            .map(|e| e.timestamp)
            .max()
            .unwrap_or(flushed_at);

        self.store
            .ensure_session(session_id, ClientInfo::default(), last_seen)
            .await
            .map_err(|e| e.to_string())?;
        let inserted = self
            .store
            .append_events(session_id, &events)
            .await
            .map_err(|e| e.to_string())?;
        self.buffer
            .acknowledge(session_id, payloads.len())
            .await
            .map_err(|e| e.to_string())?;

        tracing::debug!(session_id, read = payloads.len(), inserted, "session flushed");
        Ok(u64::try_from(payloads.len()).unwrap_or(u64::MAX))
    }
}
