//! Session event intake, status and flush DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::UserSession;
use crate::service::{FlushReport, NewEvent, SessionSummary};

/// Request body for `POST /sessions/{id}/events`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    /// Client-generated event id; flushing the same id twice stores it once.
    #[serde(default)]
    pub id: Option<Uuid>,
    /// Event kind, e.g. `"selection"` or `"click"`.
    pub event_type: String,
    /// Configurator category the event belongs to.
    pub category: String,
    /// UI element that fired the event.
    #[serde(default)]
    pub element_id: Option<String>,
    /// Selected value for selection events.
    #[serde(default)]
    pub value: Option<String>,
    /// Client timestamp; the server time is used when absent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl From<EventRequest> for NewEvent {
    fn from(req: EventRequest) -> Self {
        Self {
            id: req.id,
            event_type: req.event_type,
            category: req.category,
            element_id: req.element_id,
            value: req.value,
            timestamp: req.timestamp,
        }
    }
}

/// Response body for `POST /sessions/{id}/events` (202 Accepted).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EventAcceptedResponse {
    /// Always `true`.
    pub success: bool,
    /// Id the event was buffered under.
    pub event_id: Uuid,
}

/// Request body for `PATCH /sessions/{id}/status`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct StatusRequest {
    /// `ACTIVE`, `IN_CART`, `COMPLETED`, `ABANDONED` or `CONVERTED`.
    pub status: String,
}

/// A stored session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    /// Always `true`.
    pub success: bool,
    /// Session id.
    pub session_id: String,
    /// Lifecycle status.
    pub status: String,
    /// Client address, `"unknown"` if not reported.
    pub ip_address: String,
    /// Client user agent, `"unknown"` if not reported.
    pub user_agent: String,
    /// First time the session was stored.
    pub started_at: DateTime<Utc>,
    /// Most recent activity.
    pub last_activity: DateTime<Utc>,
    /// Total of the last quoted configuration, in cents.
    pub total_price: Option<i64>,
    /// Stored events; absent on status updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_count: Option<u64>,
}

impl From<UserSession> for SessionResponse {
    fn from(session: UserSession) -> Self {
        Self {
            success: true,
            session_id: session.session_id,
            status: session.status.as_str().to_string(),
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            started_at: session.started_at,
            last_activity: session.last_activity,
            total_price: session.total_price,
            event_count: None,
        }
    }
}

impl From<SessionSummary> for SessionResponse {
    fn from(summary: SessionSummary) -> Self {
        Self {
            event_count: Some(summary.event_count),
            ..Self::from(summary.session)
        }
    }
}

/// Response body for `POST|GET /analytics/flush`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FlushResponse {
    /// `false` when any session failed; see `errors`.
    pub success: bool,
    /// Sessions whose events were moved.
    pub sessions_flushed: u32,
    /// Events moved.
    pub events_flushed: u64,
    /// One entry per failed session.
    pub errors: Vec<String>,
}

impl From<FlushReport> for FlushResponse {
    fn from(report: FlushReport) -> Self {
        Self {
            success: report.errors.is_empty(),
            sessions_flushed: report.sessions_flushed,
            events_flushed: report.events_flushed,
            errors: report.errors,
        }
    }
}
