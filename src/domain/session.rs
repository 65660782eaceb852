//! Analytics sessions and their buffered events.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum accepted session id length.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Event type that additionally records a configurator selection.
pub const SELECTION_EVENT_TYPE: &str = "selection";

/// Lifecycle of a configurator session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Browsing the configurator.
    Active,
    /// Configuration placed in the cart.
    InCart,
    /// Checkout completed.
    Completed,
    /// Left without completing.
    Abandoned,
    /// Turned into a paying customer.
    Converted,
}

impl SessionStatus {
    /// Returns the database/text representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::InCart => "IN_CART",
            Self::Completed => "COMPLETED",
            Self::Abandoned => "ABANDONED",
            Self::Converted => "CONVERTED",
        }
    }

    /// Returns `true` if a session in `self` may move to `next`.
    ///
    /// Staying in the same status is always allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Active, Self::Active)
                | (Self::InCart, Self::InCart)
                | (Self::Completed, Self::Completed)
                | (Self::Abandoned, Self::Abandoned)
                | (Self::Converted, Self::Converted)
                | (Self::Active, Self::InCart)
                | (Self::Active, Self::Abandoned)
                | (Self::InCart, Self::Active)
                | (Self::InCart, Self::Completed)
                | (Self::InCart, Self::Abandoned)
                | (Self::Completed, Self::Converted)
                | (Self::Abandoned, Self::Active)
        )
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(Self::Active),
            "IN_CART" => Ok(Self::InCart),
            "COMPLETED" => Ok(Self::Completed),
            "ABANDONED" => Ok(Self::Abandoned),
            "CONVERTED" => Ok(Self::Converted),
            other => Err(format!("unknown session status: {other}")),
        }
    }
}

/// Persistent session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSession {
    /// Client-generated session id.
    pub session_id: String,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Client address, `"unknown"` when created by a flush.
    pub ip_address: String,
    /// Client user agent, `"unknown"` when created by a flush.
    pub user_agent: String,
    /// First time the session was seen.
    pub started_at: DateTime<Utc>,
    /// Last activity timestamp.
    pub last_activity: DateTime<Utc>,
    /// Latest quoted total, in cents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_price: Option<i64>,
}

/// An event as held in the fast buffer, serialised as JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedEvent {
    /// Unique event id; re-flushing the same event is a no-op.
    pub id: Uuid,
    /// Event kind, e.g. `"click"` or [`SELECTION_EVENT_TYPE`].
    pub event_type: String,
    /// Configurator category the event relates to.
    pub category: String,
    /// DOM element or option id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub element_id: Option<String>,
    /// Selected value, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Client time of the event.
    pub timestamp: DateTime<Utc>,
}

/// Durable interaction event row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionEvent {
    /// Event id (unique).
    pub id: Uuid,
    /// Parent session.
    pub session_id: String,
    /// Event kind.
    pub event_type: String,
    /// Configurator category.
    pub category: String,
    /// Element id.
    pub element_id: Option<String>,
    /// Selected value.
    pub selection_value: Option<String>,
    /// Client time of the event.
    pub timestamp: DateTime<Utc>,
    /// When the event was moved out of the buffer.
    pub flushed_at: DateTime<Utc>,
}

impl InteractionEvent {
    /// Builds the durable row for a buffered event.
    #[must_use]
    pub fn from_buffered(session_id: &str, event: BufferedEvent, flushed_at: DateTime<Utc>) -> Self {
        Self {
            id: event.id,
            session_id: session_id.to_string(),
            event_type: event.event_type,
            category: event.category,
            element_id: event.element_id,
            selection_value: event.value,
            timestamp: event.timestamp,
            flushed_at,
        }
    }

    /// Returns `true` if this event also records a configurator selection.
    #[must_use]
    pub fn is_selection(&self) -> bool {
        self.event_type == SELECTION_EVENT_TYPE && self.selection_value.is_some()
    }
}

/// Validates a client-supplied session id.
///
/// # Errors
///
/// Returns a description of the problem when the id is empty, too long or
/// contains characters outside `[A-Za-z0-9:_-]`.
pub fn validate_session_id(session_id: &str) -> Result<(), String> {
    if session_id.is_empty() {
        return Err("session id must not be empty".to_string());
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(format!("session id longer than {MAX_SESSION_ID_LEN} characters"));
    }
    if !session_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ':' | '_' | '-'))
    {
        return Err("session id contains invalid characters".to_string());
    }
    Ok(())
}
